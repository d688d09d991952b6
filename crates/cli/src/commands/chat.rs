//! `plantline chat` — interactive conversation on one thread.

use plantline_core::message::ThreadId;
use std::io::{BufRead, Write};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let session = super::session().await?;
    let controller = session.controller();
    let thread_id = ThreadId::new();

    println!();
    println!("  Plantline — {}", session.config().profile.plant_name);
    println!("  Model: {}", session.config().model);
    println!("  Thread: {thread_id}");
    println!();
    println!("  Type a question and press Enter. Type 'exit' to quit.");
    println!();

    let stdin = std::io::stdin();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "exit" || question == "quit" {
            break;
        }

        match controller.answer(&thread_id, question).await {
            Ok(answer) => println!("\n{answer}\n"),
            Err(e) => eprintln!("\n  Error: {e}\n"),
        }
    }

    Ok(())
}
