use clap::{Parser, Subcommand};
use std::time::Instant;

use lib::chat::{message_key, ChatManager, Message};
use lib::clipboard::SystemClipboard;
use lib::finder::{self, Filter, ServiceType};
use lib::qa::{QaClient, UiLang};
use lib::speech::{NullRecognizer, ProcessSpeech};
use lib::store::ChatStore;
use lib::text::strip_html;

#[derive(Parser)]
#[command(name = "sahayika")]
#[command(about = "Panchayat Sahayika CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: SAHAYIKA_CONFIG_PATH or ~/.sahayika/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Chat with the assistant (interactive). Conversations are saved and
    /// restored across runs.
    Chat {
        /// Config file path (default: SAHAYIKA_CONFIG_PATH or ~/.sahayika/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Override the Q&A service base URL.
        #[arg(long, value_name = "URL")]
        api: Option<String>,
    },

    /// Search the scheme/programme dataset.
    Find {
        /// Free-text search over names and descriptions (Hindi or English).
        #[arg(long, short)]
        query: Option<String>,

        /// Exact category filter.
        #[arg(long)]
        category: Option<String>,

        /// Exact department filter.
        #[arg(long)]
        department: Option<String>,

        /// "scheme" or "programme".
        #[arg(long = "type", value_name = "TYPE")]
        service_type: Option<String>,

        /// List the available categories and departments, then exit.
        #[arg(long)]
        list_filters: bool,

        /// Dataset file to search instead of the bundled one.
        #[arg(long, value_name = "PATH")]
        dataset: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("sahayika {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat { config, api }) => {
            if let Err(e) = run_chat(config, api).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Find {
            query,
            category,
            department,
            service_type,
            list_filters,
            dataset,
        }) => {
            if let Err(e) =
                run_find(query, category, department, service_type, list_filters, dataset)
            {
                log::error!("find failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::config::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_chat(
    config_path: Option<std::path::PathBuf>,
    api: Option<String>,
) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let (config, path) = lib::config::load_config(config_path)?;
    let base_url = api.unwrap_or_else(|| config.qa.base_url.clone());
    let store = ChatStore::new(lib::config::resolve_store_path(&config, &path));
    let qa = QaClient::new(Some(base_url));
    let synth = Box::new(ProcessSpeech::detect());
    let mut manager = ChatManager::new(qa, store, synth, config.chat.default_lang);
    let mut clipboard = SystemClipboard::new();
    let mut recognizer = NullRecognizer;

    println!("{}", manager.active().messages[0].text());
    println!("(/help for commands, /exit to quit)");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        manager.poll_speech();
        manager.tick(Instant::now());

        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input.split_whitespace().collect::<Vec<_>>().as_slice() {
            ["/exit"] | ["/quit"] => break,
            ["/help"] => print_help(),
            ["/new"] => {
                manager.new_conversation();
                println!("started: {}", manager.active().title);
                println!("{}", manager.active().messages[0].text());
            }
            ["/chats"] => {
                for (i, c) in manager.conversations().iter().enumerate() {
                    let marker = if c.id == manager.active_id() { "*" } else { " " };
                    println!("{} {:>2}. {}", marker, i + 1, c.title);
                }
            }
            ["/switch", n] => match parse_index(n, manager.conversations().len()) {
                Some(i) => {
                    let id = manager.conversations()[i].id.clone();
                    manager.select_conversation(&id);
                    println!("switched to: {}", manager.active().title);
                    render_conversation(&manager);
                }
                None => println!("usage: /switch <number from /chats>"),
            },
            ["/lang", lang] => match *lang {
                "hi" => manager.set_ui_lang(UiLang::Hi),
                "en" => manager.set_ui_lang(UiLang::En),
                _ => println!("usage: /lang hi|en"),
            },
            ["/speak", n] => match message_at(&manager, n) {
                Some((key, message)) => {
                    if let Some(notice) = manager.speak(&key, &message) {
                        println!("{}", notice);
                    }
                }
                None => println!("usage: /speak <message number>"),
            },
            ["/copy", n] => match message_at(&manager, n) {
                Some((key, message)) => {
                    match manager.copy(&key, &message, &mut clipboard, Instant::now()) {
                        Some(notice) => println!("{}", notice),
                        None => println!("copied."),
                    }
                }
                None => println!("usage: /copy <message number>"),
            },
            ["/mic"] => {
                if let Some(notice) = manager.start_voice_input(&mut recognizer) {
                    println!("{}", notice);
                }
            }
            _ => {
                let conversation_id = manager.active_id().to_string();
                let before = manager.active().messages.len();
                if !manager.send(input).await {
                    continue;
                }
                let conversation = manager
                    .conversations()
                    .iter()
                    .find(|c| c.id == conversation_id);
                if let Some(c) = conversation {
                    // Skip the user message we just echoed by typing it.
                    for m in c.messages.iter().skip(before + 1) {
                        render_message(m);
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_help() {
    println!("/new              start a new chat");
    println!("/chats            list chats (* marks the active one)");
    println!("/switch <n>       switch to chat n");
    println!("/lang hi|en       set the answer language");
    println!("/speak <n>        read message n aloud (again to stop)");
    println!("/copy <n>         copy message n");
    println!("/mic              voice input");
    println!("/exit             quit");
}

/// 1-based index from user input.
fn parse_index(raw: &str, len: usize) -> Option<usize> {
    let n: usize = raw.parse().ok()?;
    (1..=len).contains(&n).then(|| n - 1)
}

/// Resolve `/speak <n>` / `/copy <n>` against the active conversation.
fn message_at(manager: &ChatManager, raw: &str) -> Option<(String, Message)> {
    let active = manager.active();
    let i = parse_index(raw, active.messages.len())?;
    Some((message_key(&active.id, i), active.messages[i].clone()))
}

fn render_conversation(manager: &ChatManager) {
    for message in &manager.active().messages {
        render_message(message);
    }
}

fn render_message(message: &Message) {
    match message {
        Message::UserText { text } => println!("you: {}", text),
        Message::BotText { text } => println!("bot: {}", strip_html(text)),
        Message::AnswerCards { text, cards, .. } => {
            println!("bot: {}", strip_html(text));
            for card in cards {
                let verified = if card.verified == Some(true) {
                    " [verified]"
                } else {
                    ""
                };
                match &card.subtitle {
                    Some(sub) => println!("     - {}: {}{}", card.title, sub, verified),
                    None => println!("     - {}{}", card.title, verified),
                }
            }
        }
        Message::AnswerSources { text, sources, .. } => {
            println!("bot: {}", strip_html(text));
            for source in sources {
                let name = source
                    .name_en
                    .as_deref()
                    .or(source.name_hi.as_deref())
                    .unwrap_or("(unnamed source)");
                println!("     source: {}", name);
            }
        }
    }
}

fn run_find(
    query: Option<String>,
    category: Option<String>,
    department: Option<String>,
    service_type: Option<String>,
    list_filters: bool,
    dataset: Option<std::path::PathBuf>,
) -> anyhow::Result<()> {
    let schemes = match dataset {
        Some(path) => finder::load_from_path(path)?,
        None => finder::bundled()?,
    };

    if list_filters {
        println!("categories:");
        for c in finder::categories(&schemes) {
            println!("  {}", c);
        }
        println!("departments:");
        for d in finder::departments(&schemes) {
            println!("  {}", d);
        }
        return Ok(());
    }

    let service_type = service_type
        .map(|raw| raw.parse::<ServiceType>().map_err(anyhow::Error::msg))
        .transpose()?;
    let filter = Filter {
        query,
        category,
        department,
        service_type,
    };

    let hits = filter.apply(&schemes);
    if hits.is_empty() {
        println!("no schemes matched.");
        return Ok(());
    }
    for scheme in hits {
        let name = scheme
            .name_en
            .as_deref()
            .or(scheme.name_hi.as_deref())
            .unwrap_or("(unnamed)");
        println!("{} [{}]", name, finder::normalize_type(scheme).as_str());
        if let (Some(hi), Some(_)) = (&scheme.name_hi, &scheme.name_en) {
            println!("  {}", hi);
        }
        if let Some(desc) = scheme
            .description_en
            .as_deref()
            .or(scheme.description_hi.as_deref())
        {
            println!("  {}", desc);
        }
        if let (Some(cat), Some(dept)) = (&scheme.category, &scheme.department) {
            println!("  {} / {}", cat, dept);
        }
        println!();
    }
    Ok(())
}
