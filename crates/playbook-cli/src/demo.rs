//! The demonstration menu: a flaky task guarded by retry and a circuit
//! breaker, a build/test/deploy chain with rollback, a parallel deploy
//! group, and an async task.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use playbook_actions::{ActionGroup, ArcAction, ChainedAction, LeafAction};
use playbook_core::{MenuConfig, PlaybookError};
use playbook_hooks::{CircuitBreaker, HookManager, Phase, RetryHandler};
use playbook_menu::{Menu, MenuOption, SpinnerSpec};
use serde_json::{json, Value};
use tracing::{error, info};

pub fn build_menu(config: &MenuConfig) -> Menu {
    let mut menu = Menu::with_config("Playbook", config)
        .with_welcome_message("Select a task to run.")
        .with_exit_message("Done.");
    install_logging_hooks(menu.hooks_mut());

    let breaker = CircuitBreaker::new(2, Duration::from_secs(10));
    let mut flaky = MenuOption::new("1", "Run flaky task", flaky_task()).with_spinner(
        SpinnerSpec { message: "Poking the flaky task...".into(), ..SpinnerSpec::default() },
    );
    // Retry first: a recovered attempt must not count against the breaker.
    flaky
        .hooks_mut()
        .register(Phase::OnError, RetryHandler::new(3, Duration::from_millis(500), 2.0));
    breaker.install(flaky.hooks_mut());
    menu.add_option(flaky).expect("demo keys are unique");

    menu.add_option(
        MenuOption::new("2", "Build, test, deploy", release_pipeline())
            .with_confirm_message("Deploy to production?"),
    )
    .expect("demo keys are unique");

    menu.add_option(MenuOption::new("3", "Deploy all regions", parallel_deploy()))
        .expect("demo keys are unique");

    menu.add_option(
        MenuOption::new(
            "4",
            "Async hello",
            Arc::new(LeafAction::new_async("async_hello", |_args| async {
                tokio::time::sleep(Duration::from_millis(250)).await;
                Ok(json!("Hello from an async task"))
            })) as ArcAction,
        ),
    )
    .expect("demo keys are unique");

    menu.add_toggle("v", "verbose", "Verbose", false).expect("demo keys are unique");
    menu.add_counter("runs", "Runs", 0, 10);

    menu
}

/// Fails two calls out of every three, so retry and the circuit breaker
/// both get exercised.
fn flaky_task() -> ArcAction {
    let calls = Arc::new(AtomicU32::new(0));
    Arc::new(LeafAction::new("flaky_task", move |_args| {
        let call = calls.fetch_add(1, Ordering::SeqCst);
        if call % 3 == 2 {
            Ok(json!("Task succeeded"))
        } else {
            Err(PlaybookError::action("random failure occurred"))
        }
    }))
}

fn release_pipeline() -> ArcAction {
    let build: ArcAction = Arc::new(
        LeafAction::new("build", |_args| Ok(json!("built")))
            .with_rollback(|_args| {
                info!("removing build artifacts");
                Ok(Value::Null)
            }),
    );
    let test: ArcAction = Arc::new(LeafAction::new("test", |_args| Ok(json!("tested"))));
    let deploy: ArcAction = Arc::new(
        LeafAction::new("deploy", |_args| Ok(json!("deployed")))
            .with_rollback(|_args| {
                info!("reverting deployment");
                Ok(Value::Null)
            }),
    );
    Arc::new(ChainedAction::new("release", vec![build, test, deploy]))
}

fn parallel_deploy() -> ArcAction {
    let regions = ["east", "west", "eu"];
    let children: Vec<ArcAction> = regions
        .iter()
        .map(|region| {
            let name = format!("deploy-{region}");
            Arc::new(LeafAction::new_async(name.clone(), move |_args| {
                let name = name.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(json!(format!("{name} ok")))
                }
            })) as ArcAction
        })
        .collect();
    Arc::new(ActionGroup::new("deploy-all", children))
}

/// Menu-level start/finish/error log hooks with durations.
pub fn install_logging_hooks(hooks: &mut HookManager) {
    hooks.register_fn(Phase::Before, "log_before", |ctx| {
        info!(name = %ctx.name, "starting");
        Ok(())
    });
    hooks.register_fn(Phase::After, "log_after", |ctx| {
        match ctx.duration {
            Some(duration) => {
                info!(name = %ctx.name, elapsed_ms = duration.as_millis() as u64, "completed")
            }
            None => info!(name = %ctx.name, "completed"),
        }
        Ok(())
    });
    hooks.register_fn(Phase::OnError, "log_error", |ctx| {
        let message = ctx.error().map(|e| e.to_string()).unwrap_or_default();
        match ctx.duration {
            Some(duration) => error!(
                name = %ctx.name,
                elapsed_ms = duration.as_millis() as u64,
                error = %message,
                "failed"
            ),
            None => error!(name = %ctx.name, error = %message, "failed"),
        }
        Ok(())
    });
}
