use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "stringsvc-cli")]
#[command(about = "Client for a running string service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a string to upper case
    Uppercase { s: String },
    /// Convert a string to lower case
    Downcase { s: String },
    /// Count the bytes of a string
    Count { s: String },
    /// Check whether a string is a palindrome
    Palindrome { s: String },
    /// Check service health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let (path, s) = match cli.command {
        Commands::Uppercase { s } => ("uppercase", s),
        Commands::Downcase { s } => ("downcase", s),
        Commands::Count { s } => ("count", s),
        Commands::Palindrome { s } => ("palindrome", s),
        Commands::Health => {
            let res = client.get(format!("{}/health", base)).send().await?;
            return print_response(res).await;
        }
    };

    let res = client
        .post(format!("{}/{}", base, path))
        .json(&json!({ "s": s }))
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Err(format!("service returned status {}", status).into());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    match json.get("err").and_then(Value::as_str) {
        Some(err) if !err.is_empty() => Err(format!("service error: {}", err).into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &'static str) -> reqwest::Response {
        reqwest::Response::from(
            axum::http::Response::builder()
                .status(status)
                .body(body)
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_success_reply_exits_cleanly() {
        assert!(print_response(response(200, r#"{"v":"HELLO"}"#)).await.is_ok());
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let err = print_response(response(502, "bad gateway")).await.unwrap_err();
        assert_eq!(err.to_string(), "service returned status 502 Bad Gateway");
    }

    #[tokio::test]
    async fn test_error_in_body_is_an_error() {
        let err = print_response(response(200, r#"{"v":"","err":"empty string"}"#))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "service error: empty string");
    }
}
