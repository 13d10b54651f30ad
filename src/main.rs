// kura - build-time asset pipeline
// Entry point with clean separation of concerns

use kura::cli::{exit_code, CliHandler};

#[tokio::main]
async fn main() {
    let handler = CliHandler::new();

    if let Err(e) = handler.run().await {
        eprintln!("{}", e.format_detailed());
        std::process::exit(exit_code(&e));
    }
}
