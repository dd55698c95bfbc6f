//! Nested steps with hooks, a skipped branch and a forgotten await.
//!
//! ```bash
//! RUST_LOG=devlog=debug cargo run --example nested_steps
//! ```

use devlog::prelude::*;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    devlog::logging::init();

    let root = RootContext::with_config(TrackerConfig::from_env())?;

    root.before_each(hook_fn(|info| {
        println!("  (before {})", info.message);
        Ok(())
    }));
    root.after_each(hook_fn(|info| {
        println!("  (after {})", info.message);
        Ok(())
    }));

    let report = root
        .step("release", |cx| {
            cx.after(hook_fn(|info| {
                println!("  (cleanup for {})", info.message);
                Ok(())
            }));
            async move {
                cx.step("build", |cx| async move {
                    cx.step("compile", |_| async {
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        Ok(())
                    })
                    .await?;
                    cx.step_sync("link", |_| Ok(())).await?;
                    Ok(())
                })
                .await?;

                cx.skip().step("publish", |_| async { Ok(()) }).await?;

                // Not awaited: "verify" still waits for "package" and the
                // overlap is reported.
                cx.step("package", |_| async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(())
                });
                cx.step("verify", |_| async { Err("checksum mismatch".into()) });
                cx.idle().await;
                Ok(())
            }
        })
        .await?;

    println!("Release finished: {:?} ({} failure(s))", report.outcome, report.failures.len());
    for run in root.runs() {
        println!("{} {} running={}", run.id(), run.description(), run.is_running());
    }
    Ok(())
}
