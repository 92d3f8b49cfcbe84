use anyhow::{Context, Result, anyhow, bail};
use autumnus::{FormatterOption, Options, highlight, themes};
use clap::{Parser, Subcommand, ValueHint};
use formdata_upload::{FormData, UploadClient, UploadRequest, encode_for_bridge};
use futures::future::join_all;
use serde_json::{Value, json};
use std::{fs, path::PathBuf, time::Duration};
use tracing_subscriber::EnvFilter;

use crate::form_args::{FormArg, extend_form, parse_header, parse_timeout, read_payload};

mod config;
mod form_args;

#[derive(Parser)]
#[command(name = "fdup")]
#[command(version)]
#[command(about = "Submit multipart form data and print the normalized response")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a value back, wrapped the way adapters receive it
    Echo { value: String },
    /// POST a multipart form to one or more URLs
    Upload {
        /// Target URLs; uploads to several URLs run concurrently
        #[arg(value_hint = ValueHint::Url)]
        urls: Vec<String>,
        /// Form field: key=value, key:=json or key=@path[;type=mime]
        #[arg(short = 'F', long = "form")]
        fields: Vec<FormArg>,
        /// Request header, e.g. 'Authorization: Bearer ...'
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
        /// A JSON file with url, headers, formData and timeout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        request: Option<PathBuf>,
        /// Timeout as milliseconds or a duration such as 5s
        #[arg(short, long, value_parser = parse_timeout)]
        timeout: Option<Duration>,
        /// Syntax highlight the JSON output
        #[arg(long)]
        color: bool,
    },
    /// Print a file as a base64 data URL
    Encode {
        #[arg(value_hint = ValueHint::FilePath)]
        path: PathBuf,
        /// MIME type; guessed from the extension when omitted
        #[arg(short, long)]
        mime: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    rt.block_on(run(cli.command))
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Echo { value } => {
            print_json(&serde_json::to_value(formdata_upload::echo(value))?, false)
        }
        Commands::Encode { path, mime } => {
            let payload = read_payload(&path, mime.as_deref())?;
            println!("{}", encode_for_bridge(&payload));
            Ok(())
        }
        Commands::Upload {
            urls,
            fields,
            headers,
            request,
            timeout,
            color,
        } => {
            let (request, user_agent) =
                build_request(urls.first().cloned(), fields, headers, request, timeout)?;
            upload(request, &user_agent, urls, color).await
        }
    }
}

/// Layers config file/env, the request file and command line flags, in
/// increasing order of precedence. Also returns the configured user agent.
fn build_request(
    url: Option<String>,
    fields: Vec<FormArg>,
    headers: Vec<(String, String)>,
    request_file: Option<PathBuf>,
    timeout: Option<Duration>,
) -> Result<(UploadRequest, String)> {
    let config = config::read_config()?;

    let mut request = match request_file {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Unable to read {}", path.display()))?;
            serde_json::from_str::<UploadRequest>(&content).map_err(|e| {
                anyhow!("Failed to parse request: {e} from file {}", path.display())
            })?
        }
        None => UploadRequest::new(String::new(), FormData::new()),
    };

    if let Some(url) = url {
        request.url = url;
    }
    if request.url.is_empty() {
        bail!("A URL must be given on the command line or in the request file");
    }

    for (name, value) in config.headers {
        request.headers.entry(name).or_insert(value);
    }
    request.headers.extend(headers);

    extend_form(&mut request.form_data, fields)?;

    request.timeout = timeout
        .map(|t| t.as_millis() as u64)
        .or(request.timeout)
        .or(Some(config.timeout_ms));

    Ok((request, config.user_agent))
}

async fn upload(
    request: UploadRequest,
    user_agent: &str,
    urls: Vec<String>,
    color: bool,
) -> Result<()> {
    let client = UploadClient::with_user_agent(user_agent)?;

    if urls.len() <= 1 {
        let response = client.upload(request).await?;
        return print_json(&serde_json::to_value(response)?, color);
    }

    let uploads = urls.iter().map(|url| {
        let mut request = request.clone();
        request.url = url.clone();
        client.upload(request)
    });
    let results = join_all(uploads).await;

    let mut failures = 0;
    let report: Vec<Value> = urls
        .iter()
        .zip(results)
        .map(|(url, result)| match result {
            Ok(response) => json!({ "url": url, "response": response }),
            Err(e) => {
                failures += 1;
                json!({ "url": url, "error": e.to_string() })
            }
        })
        .collect();

    print_json(&Value::Array(report), color)?;
    if failures > 0 {
        bail!("{failures} of {} uploads failed", urls.len());
    }
    Ok(())
}

fn print_json(value: &Value, color: bool) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    if !color {
        println!("{rendered}");
        return Ok(());
    }

    let output = highlight(
        &rendered,
        Options {
            formatter: FormatterOption::Terminal {
                theme: themes::get("ayu_light").into_iter().next(),
            },
            lang_or_file: Some("json"),
        },
    );
    println!("{}", output);
    Ok(())
}
