//! zcap CLI: the `zcap` command.
//!
//! Derives root capability identifiers, manages signer keys, delegates
//! capabilities, and invokes them with signed HTTP requests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use zcap_client::capability::decode_root_capability_uri;
use zcap_client::{
    root_capability_uri, validate_capability, CapabilityRef, ClientConfig, DelegationBuilder,
    Ed25519Signer, Ed25519Suite, HttpResponse, RequestOptions, ReqwestTransport, Signer,
    TransportConfig, ZcapClient,
};

// ── Key file helpers ──────────────────────────────────────────────────────────

/// On-disk form of a signer key.
#[derive(Debug, Serialize, Deserialize)]
struct KeyFile {
    controller: String,
    key_id: String,
    /// Base64 Ed25519 seed.
    seed: String,
}

fn load_signer(path: &Path) -> Result<Ed25519Signer> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read key file {}", path.display()))?;
    let key: KeyFile = serde_json::from_str(&raw)
        .with_context(|| format!("invalid key file {}", path.display()))?;
    let signer = Ed25519Signer::from_seed_base64(&key.seed).context("invalid key seed")?;
    if signer.id() != key.key_id {
        return Err(anyhow!(
            "key file {} names key '{}' but its seed derives '{}'",
            path.display(),
            key.key_id,
            signer.id()
        ));
    }
    Ok(signer)
}

// ── Capability file helpers ───────────────────────────────────────────────────

/// Read a capability from a file, `-` for stdin, or a bare root capability id.
fn read_capability(source: &str) -> Result<CapabilityRef> {
    let raw = if source == "-" {
        std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?
    } else if source.starts_with("urn:") {
        return validate_capability(&serde_json::Value::String(source.to_string()))
            .map_err(|e| anyhow!("{e}"));
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("failed to read capability file {source}"))?
    };
    let value: serde_json::Value =
        serde_json::from_str(&raw).context("capability is not valid JSON")?;
    validate_capability(&value).map_err(|e| anyhow!("{e}"))
}

fn write_output(output: Option<&Path>, contents: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, format!("{contents}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{contents}"),
    }
    Ok(())
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// Derive, delegate and invoke Authorization Capabilities.
#[derive(Parser, Debug)]
#[command(
    name = "zcap",
    about = "zcap client CLI",
    version,
    long_about = "zcap: Authorization Capabilities client\n\nDerive root capabilities, delegate attenuated capabilities,\nand invoke them with signed HTTP requests."
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the root capability id for a target URL
    Root {
        /// Absolute invocation target URL
        url: String,
    },

    /// Print the target URL encoded in a root capability id
    Decode {
        /// Root capability id (urn:zcap:root:...)
        id: String,
    },

    /// Generate a new Ed25519 signer key
    Keygen {
        /// Write the key file here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Validate a capability and print a summary
    Validate {
        /// Capability file, `-` for stdin, or a root capability id
        capability: String,

        /// Also check the Ed25519Signature2020 delegation proof
        #[arg(long)]
        verify: bool,
    },

    /// Delegate a capability to another controller
    Delegate {
        /// Key file of the delegating signer
        #[arg(long)]
        key: PathBuf,

        /// Controller receiving the capability (e.g. a did:key)
        #[arg(long)]
        to: String,

        /// Parent capability file or root capability id
        #[arg(long)]
        capability: Option<String>,

        /// Invocation target URL
        #[arg(long)]
        target: Option<String>,

        /// Expiry as an RFC 3339 timestamp (default: 5 minutes from now)
        #[arg(long)]
        expires: Option<String>,

        /// Allowed action (repeatable)
        #[arg(long = "action")]
        actions: Vec<String>,

        /// Write the capability here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Invoke a capability with a signed GET (action `read`)
    Read {
        #[command(flatten)]
        invoke: InvokeArgs,
    },

    /// Invoke a capability with a signed POST (action `write`)
    Write {
        #[command(flatten)]
        invoke: InvokeArgs,

        /// JSON body to send
        #[arg(long)]
        data: String,
    },
}

#[derive(clap::Args, Debug)]
struct InvokeArgs {
    /// Request URL (absolute, or relative to --base-url)
    url: Option<String>,

    /// Key file of the invoking signer
    #[arg(long)]
    key: PathBuf,

    /// Capability file or root capability id
    #[arg(long)]
    capability: Option<String>,

    /// Base URL for relative request URLs
    #[arg(long)]
    base_url: Option<String>,

    /// Extra request header as NAME:VALUE (repeatable)
    #[arg(long = "header")]
    headers: Vec<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,
}

// ── Main entry point ──────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let verbose = cli.verbose;

    let result = match cli.command {
        Commands::Root { url } => cmd_root(&url),
        Commands::Decode { id } => cmd_decode(&id),
        Commands::Keygen { out } => cmd_keygen(out.as_deref(), verbose),
        Commands::Validate { capability, verify } => cmd_validate(&capability, verify, verbose),
        Commands::Delegate {
            key,
            to,
            capability,
            target,
            expires,
            actions,
            out,
        } => {
            cmd_delegate(
                &key,
                &to,
                capability.as_deref(),
                target,
                expires,
                actions,
                out.as_deref(),
                verbose,
            )
            .await
        }
        Commands::Read { invoke } => cmd_invoke(invoke, None, verbose).await,
        Commands::Write { invoke, data } => cmd_invoke(invoke, Some(&data), verbose).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

// ── Command implementations ───────────────────────────────────────────────────

/// `zcap root <URL>`
fn cmd_root(url: &str) -> Result<()> {
    let id = root_capability_uri(url)?;
    println!("{id}");
    Ok(())
}

/// `zcap decode <ID>`
fn cmd_decode(id: &str) -> Result<()> {
    let target = decode_root_capability_uri(id)?;
    println!("{target}");
    Ok(())
}

/// `zcap keygen [--out FILE]`
fn cmd_keygen(out: Option<&Path>, verbose: bool) -> Result<()> {
    if let Some(path) = out {
        if path.exists() {
            return Err(anyhow!("refusing to overwrite existing key file {}", path.display()));
        }
    }

    let signer = Ed25519Signer::generate();
    let key = KeyFile {
        controller: signer.controller().to_string(),
        key_id: signer.id().to_string(),
        seed: signer.seed_base64(),
    };
    let json = serde_json::to_string_pretty(&key)?;
    write_output(out, &json)?;

    if out.is_some() {
        println!("{}", key.controller);
        if verbose {
            println!("  Key ID: {}", key.key_id);
        }
    }
    Ok(())
}

/// `zcap validate <CAPABILITY> [--verify]`
fn cmd_validate(source: &str, verify: bool, verbose: bool) -> Result<()> {
    let capability = read_capability(source)?;

    println!("Capability: {}", capability.id());
    println!("  Target:  {}", capability.invocation_target());
    match &capability {
        CapabilityRef::Root(_) => println!("  Kind:    root"),
        CapabilityRef::Delegated(cap) => {
            println!("  Kind:    delegated");
            println!("  Controller: {}", cap.controller);
            println!("  Parent:  {}", cap.parent_capability);
            println!("  Expires: {}", cap.expires);
            if cap.allowed_action.is_empty() {
                println!("  Actions: (inherited)");
            } else {
                println!("  Actions: {}", cap.allowed_action.join(", "));
            }
            if let Some(expires) = cap.expires_at() {
                if expires <= chrono::Utc::now() {
                    println!("  Status:  EXPIRED");
                }
            }
        }
    }
    println!("  Chain length: {}", capability.chain_len());
    if verbose {
        for (i, link) in capability.capability_chain().iter().enumerate() {
            println!("    [{i}] {link}");
        }
    }

    if verify {
        match capability.as_delegated() {
            Some(cap) => {
                Ed25519Suite::new()
                    .verify_delegation_proof(cap)
                    .context("delegation proof does not verify")?;
                println!("  Proof:   valid");
            }
            None => println!("  Proof:   (root capabilities carry no proof)"),
        }
    }
    Ok(())
}

/// `zcap delegate --key FILE --to CONTROLLER [--capability C] [--target URL] ...`
#[allow(clippy::too_many_arguments)]
async fn cmd_delegate(
    key: &Path,
    to: &str,
    capability: Option<&str>,
    target: Option<String>,
    expires: Option<String>,
    actions: Vec<String>,
    out: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let signer = load_signer(key)?;
    let client = ZcapClient::builder()
        .delegation_signer(Arc::new(signer))
        .build()?;

    let mut builder = DelegationBuilder::new(to);
    if let Some(source) = capability {
        builder = builder.capability(read_capability(source)?);
    }
    if let Some(target) = target {
        builder = builder.invocation_target(target);
    }
    if let Some(expires) = expires {
        builder = builder.expires(expires);
    }
    if !actions.is_empty() {
        builder = builder.allowed_actions(actions);
    }

    let delegated = client.delegate(builder).await.context("delegation failed")?;
    if verbose {
        eprintln!(
            "Delegated {} to {} (expires {})",
            delegated.invocation_target, delegated.controller, delegated.expires
        );
    }
    write_output(out, &serde_json::to_string_pretty(&delegated)?)
}

/// `zcap read|write [URL] --key FILE [--capability C] ...`
async fn cmd_invoke(args: InvokeArgs, data: Option<&str>, verbose: bool) -> Result<()> {
    let signer = load_signer(&args.key)?;
    log::debug!("invoking as {}", signer.id());

    let config = ClientConfig {
        base_url: args.base_url,
        ..ClientConfig::default()
    };
    let transport = ReqwestTransport::new(&TransportConfig {
        timeout_seconds: Some(args.timeout),
        ..TransportConfig::default()
    })?;
    let client = ZcapClient::builder()
        .config(config)
        .transport(Arc::new(transport))
        .invocation_signer(Arc::new(signer))
        .build()?;

    let mut options = RequestOptions::new();
    if let Some(url) = args.url {
        options = options.url(url);
    }
    if let Some(source) = args.capability.as_deref() {
        options = options.capability(read_capability(source)?);
    }
    for header in &args.headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| anyhow!("header must be NAME:VALUE, got '{header}'"))?;
        options = options.header(name.trim(), value.trim());
    }

    let response = match data {
        Some(data) => {
            let body: serde_json::Value =
                serde_json::from_str(data).context("--data is not valid JSON")?;
            client.write(options.json(body)).await?
        }
        None => client.read(options).await?,
    };
    print_response(&response, verbose);

    if !response.is_success() {
        return Err(anyhow!("server responded with status {}", response.status));
    }
    Ok(())
}

fn print_response(response: &HttpResponse, verbose: bool) {
    if verbose {
        eprintln!("Status: {}", response.status);
        for (name, value) in &response.headers {
            eprintln!("  {name}: {value}");
        }
    }
    match response.json::<serde_json::Value>() {
        Ok(json) => println!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| response.text())
        ),
        Err(_) => println!("{}", response.text()),
    }
}
