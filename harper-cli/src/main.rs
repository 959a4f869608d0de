//! harper-cli: terminal chat host for the Harper HTTP API
//!
//! Keeps the conversation history in memory and sends it with every turn,
//! exactly like the web host does. Clearing only drops local history; the
//! server-side logs are never touched.
//!
//! # Subcommands
//! - `chat [--unique-session]`                  - interactive chat
//! - `ask <message>`                            - single turn, no history
//! - `examples`                                 - list example prompts
//! - `admin login --password <pw>`              - log statistics
//! - `admin export --password <pw> [-o <file>]` - download the CSV log
//! - `status`                                   - show server health

use std::io::{self, BufRead, Write};
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

const DEFAULT_SERVER: &str = "http://127.0.0.1:7860";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "harper-cli",
    version,
    about = "Chat with Dr. Alex Harper from the terminal"
)]
struct Cli {
    /// Harper HTTP server URL (overrides HARPER_HTTP_URL env var)
    #[arg(long, env = "HARPER_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interactive chat session
    Chat {
        /// Send a generated session id per conversation instead of the
        /// server's clock-minute id
        #[arg(long)]
        unique_session: bool,
    },

    /// Send a single message with no history
    Ask {
        message: String,
    },

    /// List example prompts
    Examples,

    /// Admin actions (password required)
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },

    /// Show Harper server status
    Status,
}

#[derive(Debug, Subcommand)]
enum AdminAction {
    /// Check the password and print log statistics
    Login {
        #[arg(long, env = "ADMIN_PASSWORD")]
        password: String,
    },

    /// Download the CSV log
    Export {
        #[arg(long, env = "ADMIN_PASSWORD")]
        password: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: String,
    pub content: String,
}

impl Turn {
    fn user(content: &str) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    fn assistant(content: &str) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    message: &'a str,
    history: &'a [Turn],
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginReply {
    pub granted: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ExamplesReply {
    examples: Vec<String>,
}

// ============================================================================
// Conversation state
// ============================================================================

/// Local chat state. The user turn is pushed before the request goes out, so
/// a failed request leaves an unanswered entry that the server drops when
/// pairing history on the next turn.
#[derive(Debug, Default)]
pub struct Conversation {
    history: Vec<Turn>,
    session_id: Option<String>,
    unique_session: bool,
}

impl Conversation {
    pub fn new(unique_session: bool) -> Self {
        let mut conv = Self {
            unique_session,
            ..Self::default()
        };
        conv.rotate_session();
        conv
    }

    fn rotate_session(&mut self) {
        self.session_id = self
            .unique_session
            .then(|| uuid::Uuid::new_v4().to_string());
    }

    /// History to send with `message`, then record `message` as pending.
    pub fn begin_turn(&mut self, message: &str) -> Vec<Turn> {
        let prior = self.history.clone();
        self.history.push(Turn::user(message));
        prior
    }

    pub fn finish_turn(&mut self, reply: &str) {
        self.history.push(Turn::assistant(reply));
    }

    /// Drop the pending user entry of a failed turn so later turns keep
    /// strict user/assistant alternation.
    pub fn abandon_turn(&mut self) {
        if self.history.len() % 2 == 1 {
            self.history.pop();
        }
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.rotate_session();
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

/// Resolve an interactive input line to a message, mapping `/N` to example N.
pub fn resolve_input(line: &str, examples: &[String]) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(n) = line.strip_prefix('/').and_then(|n| n.parse::<usize>().ok()) {
        return examples.get(n.checked_sub(1)?).cloned();
    }
    Some(line.to_string())
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

struct Api {
    client: reqwest::blocking::Client,
    server: String,
}

impl Api {
    fn new(server: &str) -> anyhow::Result<Self> {
        // no request timeout: a completion may take as long as it takes
        let client = reqwest::blocking::Client::builder()
            .timeout(None::<Duration>)
            .build()?;
        Ok(Self {
            client,
            server: server.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server, path)
    }

    fn chat(
        &self,
        message: &str,
        history: &[Turn],
        session_id: Option<&str>,
    ) -> anyhow::Result<ChatReply> {
        let resp = self
            .client
            .post(self.url("/chat"))
            .json(&ChatBody {
                message,
                history,
                session_id,
            })
            .send()?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body: serde_json::Value = resp.json().unwrap_or_default();
            anyhow::bail!(
                "server returned {}: {}",
                status,
                body["error"].as_str().unwrap_or("unknown error")
            );
        }
        Ok(resp.json()?)
    }

    fn examples(&self) -> anyhow::Result<Vec<String>> {
        let resp: ExamplesReply = self
            .client
            .get(self.url("/examples"))
            .send()?
            .error_for_status()?
            .json()?;
        Ok(resp.examples)
    }

    fn login(&self, password: &str) -> anyhow::Result<LoginReply> {
        Ok(self
            .client
            .post(self.url("/admin/login"))
            .json(&serde_json::json!({ "password": password }))
            .send()?
            .error_for_status()?
            .json()?)
    }

    fn export(&self, password: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let resp = self
            .client
            .post(self.url("/admin/export"))
            .json(&serde_json::json!({ "password": password }))
            .send()?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(resp.error_for_status()?.bytes()?.to_vec()))
    }
}

fn print_examples(examples: &[String]) {
    for (i, e) in examples.iter().enumerate() {
        println!("  /{}  {}", i + 1, e);
    }
}

fn do_chat(api: &Api, unique_session: bool) -> anyhow::Result<()> {
    let examples = api.examples().unwrap_or_default();
    let mut conv = Conversation::new(unique_session);

    println!("🚭 Dr. Alex Harper, your friend who gets it 💙");
    println!("Commands: /examples, /N (send example N), /clear, /quit\n");

    let stdin = io::stdin();
    loop {
        print!("you> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        match line.trim() {
            "/quit" | "/exit" => break,
            "/clear" => {
                conv.clear();
                println!("(history cleared)\n");
                continue;
            }
            "/examples" => {
                print_examples(&examples);
                continue;
            }
            _ => {}
        }

        let Some(message) = resolve_input(&line, &examples) else {
            continue;
        };

        let history = conv.begin_turn(&message);
        match api.chat(&message, &history, conv.session_id()) {
            Ok(reply) => {
                println!("alex> {}\n", reply.reply);
                conv.finish_turn(&reply.reply);
            }
            Err(e) => {
                conv.abandon_turn();
                eprintln!("harper-cli: {}\n", e);
            }
        }
    }

    Ok(())
}

fn do_ask(api: &Api, message: &str) -> anyhow::Result<()> {
    let reply = api.chat(message, &[], None)?;
    println!("{}", reply.reply);
    Ok(())
}

fn do_admin(api: &Api, action: AdminAction) -> anyhow::Result<()> {
    match action {
        AdminAction::Login { password } => {
            let reply = api.login(&password)?;
            println!("{}", reply.message);
            if !reply.granted {
                std::process::exit(1);
            }
        }
        AdminAction::Export { password, output } => match api.export(&password)? {
            Some(bytes) => match output {
                Some(path) => {
                    std::fs::write(&path, &bytes)?;
                    eprintln!("Wrote {} bytes to {}", bytes.len(), path);
                }
                None => io::stdout().write_all(&bytes)?,
            },
            None => {
                eprintln!("harper-cli: export unavailable (wrong password or no logs yet)");
                std::process::exit(1);
            }
        },
    }
    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(api: &Api) -> anyhow::Result<()> {
    let url = api.url("/health");
    match api.client.get(&url).timeout(Duration::from_secs(10)).send() {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Harper server:  {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:        {}", body["version"].as_str().unwrap_or("?"));
            println!("Model:          {}", body["model"].as_str().unwrap_or("?"));
            println!("Structured log: {}", body["structured_log"].as_str().unwrap_or("?"));
            println!("Tabular log:    {}", body["tabular_log"].as_str().unwrap_or("?"));
            if body["default_admin_secret"].as_bool().unwrap_or(false) {
                println!("⚠️  Admin password is the built-in default");
            }
        }
        Ok(r) => {
            eprintln!("harper-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("harper-cli: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = Api::new(&server).and_then(|api| match cli.command {
        Commands::Chat { unique_session } => do_chat(&api, unique_session),
        Commands::Ask { message } => do_ask(&api, &message),
        Commands::Examples => api.examples().map(|e| print_examples(&e)),
        Commands::Admin { action } => do_admin(&api, action),
        Commands::Status => do_status(&api),
    });

    if let Err(e) = result {
        eprintln!("harper-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
