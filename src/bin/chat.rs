use clap::Parser;
use quickbite::chatbot::client::{ChatSession, ChatTurn, HttpChatTransport, QUICK_REPLIES};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Terminal client for the QuickBite food assistant.
#[derive(Debug, Parser)]
#[command(name = "quickbite-chat", version)]
struct Args {
    /// Base URL of the QuickBite server.
    #[arg(long, env = "SERVER_URL", default_value = "http://localhost:8080")]
    server_url: String,
}

fn render(turn: &ChatTurn) {
    let who = if turn.is_bot { "bot" } else { "you" };
    println!("[{who}] {}", turn.text);
    for (title, items) in [
        ("Found", &turn.products),
        ("You might like", &turn.recommendations),
    ] {
        if items.is_empty() {
            continue;
        }
        println!("  {title} ({}):", items.len());
        for p in items.iter() {
            println!(
                "    - {} | {} | ₹{} | {} | ⭐ {:.1} ({})",
                p.name, p.category, p.price, p.shop.name, p.rating.average, p.rating.count
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    quickbite::init_tracing("quickbite=warn");
    let args = Args::parse();

    let mut session = ChatSession::new(HttpChatTransport::new(&args.server_url));
    render(&session.turns()[0]);
    println!();
    for (i, label) in QUICK_REPLIES.iter().enumerate() {
        println!("  /{} {label}", i + 1);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "/quit" {
            break;
        }
        let quick = line
            .strip_prefix('/')
            .and_then(|n| n.parse::<usize>().ok())
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| QUICK_REPLIES.get(i));
        let reply = match quick {
            Some(label) => session.quick_reply(label).await,
            None => {
                session.set_input(line);
                session.send().await
            }
        };
        if let Some(turn) = reply {
            render(turn);
        }
    }
    Ok(())
}
