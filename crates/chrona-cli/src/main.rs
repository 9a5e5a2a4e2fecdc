//! Entry point for the `chrona` binary.
//!
//! Run with no arguments from a scheduler to publish today's post.

use chrona_cli::{Cli, dispatch, start_logging};
use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let code = match start_logging(&cli) {
        Ok(guard) => {
            let code = report(dispatch(cli).await);
            // `process::exit` skips destructors; the file writer flushes on drop.
            drop(guard);
            code
        }
        Err(err) => report(Err(err)),
    };
    std::process::exit(code);
}

fn report(result: anyhow::Result<i32>) -> i32 {
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            1
        }
    }
}
