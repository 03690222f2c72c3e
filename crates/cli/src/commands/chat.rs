//! `mlstudio chat` — Single-message or interactive chat with the AI assistant.

use std::io::{BufRead, Write};

use super::{CmdResult, fail, open_authenticated};

pub async fn run(api_url: Option<String>, message: Option<String>, model: Option<String>) -> CmdResult {
    let workbench = open_authenticated(api_url).await?;
    let model = model.unwrap_or_else(|| workbench.config().chat.default_model.clone());

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let result = workbench.chat(&msg, Some(&model)).await;
        eprint!("\r              \r");
        println!("{}", result.map_err(fail)?.response);
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  ML Studio Assistant — model: {model}");
    println!("  Type your message and press Enter. Type 'exit' or Ctrl+D to quit.");
    println!();

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next().transpose()? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        eprint!("  ...");
        match workbench.chat(line, Some(&model)).await {
            Ok(reply) => {
                eprint!("\r     \r");
                println!();
                for text in reply.response.lines() {
                    println!("  Assistant > {text}");
                }
                println!();
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  [Error] {}", e.user_message());
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye! 👋");
    println!();
    Ok(())
}
