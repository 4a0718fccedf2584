//! End-to-end example using the toolwiz meta crate.
//!
//! This demonstrates:
//! 1. Loading layered configuration (file + `TOOLWIZ_*` environment)
//! 2. Restoring or configuring the image credential
//! 3. Running a text and an image request concurrently
//! 4. Cancelling a request from the host side
//!
//! Run with a local OpenAI-compatible completion server on
//! `http://localhost:8080/v1` and, optionally, `RUNWARE_API_KEY` set:
//!
//! ```text
//! RUST_LOG=toolwiz=debug cargo run -p toolwiz --example generate
//! ```

use std::time::Duration;
use toolwiz::prelude::*;

fn describe(label: &str, result: &GenerationResult) {
    match result {
        GenerationResult::Success {
            request_id,
            payload,
            cost,
            degraded,
        } => {
            println!("=== {} ({}) ===", label, request_id);
            if *degraded {
                println!("(degraded mode)");
            }
            match payload {
                Payload::Text(blob) => println!("{}", blob.text),
                Payload::Image(image) => {
                    println!("prompt: {}", image.prompt);
                    println!("image:  {}", serde_json::to_string(&image.image).unwrap_or_default());
                }
            }
            if let Some(cost) = cost {
                println!("cost:   {}", cost);
            }
        }
        GenerationResult::Failure {
            request_id,
            kind,
            message,
        } => {
            eprintln!("=== {} ({}) failed: {} - {}", label, request_id, kind, message);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ToolwizConfig::load(None)?;
    let orchestrator = toolwiz::from_config(&config)?;

    let mut image_state = orchestrator.restore_image().await;
    if let Ok(key) = std::env::var("RUNWARE_API_KEY") {
        image_state = orchestrator.configure_image(key).await?;
    }
    println!("Image provider: {}", image_state);

    let text_request = TextRequest::new("the benefits of renewable energy").with_kind(TextKind::Blog);
    let image_request = ImageRequest::new("a sunset over the ocean")
        .with_style(ImageStyle::Watercolor)
        .with_size(ImageSize::MEDIUM);

    let (text, image) = futures::future::join(
        orchestrator.submit_generation(text_request.into()),
        orchestrator.submit_generation(image_request.into()),
    )
    .await;

    describe("text", &text);
    describe("image", &image);

    // A request cancelled by the host ends in a Cancelled failure
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });
    let cancelled = orchestrator
        .submit_with_cancel(
            TextRequest::new("a long story about the sea")
                .with_kind(TextKind::Story)
                .with_max_new_tokens(1024)
                .into(),
            token,
        )
        .await;
    describe("cancelled", &cancelled);

    Ok(())
}
