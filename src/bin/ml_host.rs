//! Process-boundary host for the inference bridge.
//!
//! Usage:
//!   ml-host <MODEL_PATH> <ENCLAVE_PATH> --simulate --attest
//!   ml-host <MODEL_PATH> <ENCLAVE_PATH> --simulate --use-stdin
//!
//! In `--use-stdin` mode each input line is a comma-separated list of integer
//! or float tokens; one output line of comma-separated floats is printed per
//! input line. `quit` or `exit` ends the loop.
//!
//! With `--references <FILE>` (two lines: positive then negative reference
//! embedding, comma-separated) each output line is instead the sentiment
//! label of the embedding.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use enclave_inference_bridge::classify::decode_embedding;
use enclave_inference_bridge::{
    Bridge, BridgeConfig, DType, DelegateHost, HostCalls, MockEngine, MockEvidenceGenerator,
    SentimentClassifier, SessionHandle, TensorSpec,
};

#[derive(Parser, Debug)]
#[command(name = "ml-host", about = "Host process for enclave-brokered ML inference")]
struct Args {
    /// Path to the model file handed to the trusted side.
    model_path: PathBuf,

    /// Path to the signed trusted binary.
    enclave_path: PathBuf,

    /// Print attestation evidence as hex and exit.
    #[arg(long)]
    attest: bool,

    /// Serve inference requests line by line from stdin.
    #[arg(long)]
    use_stdin: bool,

    /// Run the trusted side in simulation mode.
    #[arg(long)]
    simulate: bool,

    /// Expected width of the output embedding. Sizes the first output buffer;
    /// a model producing more is retried once at the size it reports.
    #[arg(long, default_value_t = 384)]
    embedding_dim: usize,

    /// Reference embeddings for sentiment classification of each output.
    #[arg(long)]
    references: Option<PathBuf>,
}

/// Token ids with a variable sequence length.
fn input_spec() -> TensorSpec {
    TensorSpec::new("input_ids", DType::I64, vec![-1])
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let failed = e.use_stderr();
            e.print().ok();
            return if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("host error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    if !args.simulate {
        bail!("no hardware trusted execution backend in this build; pass --simulate");
    }

    let image = std::fs::read(&args.enclave_path)
        .with_context(|| format!("reading trusted binary {}", args.enclave_path.display()))?;
    let generator = MockEvidenceGenerator::from_binary(&image);
    tracing::info!(
        measurement = %hex::encode(generator.measurement()),
        "trusted side created (simulation)"
    );

    let engine = MockEngine::new(input_spec(), args.embedding_dim);
    let bridge = Bridge::new(DelegateHost::new(engine), BridgeConfig::default())
        .with_evidence_generator(Arc::new(generator));

    if args.attest {
        let evidence = bridge
            .get_attestation_evidence()
            .context("get_attestation_evidence")?;
        println!("{}", evidence.to_hex());
        return Ok(());
    }

    if !args.use_stdin {
        bail!("no mode selected; pass --attest or --use-stdin");
    }

    let classifier = args
        .references
        .as_deref()
        .map(load_references)
        .transpose()?;

    let model = std::fs::read(&args.model_path)
        .with_context(|| format!("reading model {}", args.model_path.display()))?;
    let session = bridge.load_model(&model).context("load_model")?;

    let capacity_hint = args.embedding_dim * std::mem::size_of::<f32>();
    let served = serve_lines(
        &bridge,
        session,
        input_spec().dtype,
        capacity_hint,
        classifier.as_ref(),
        io::stdin().lock(),
        io::stdout().lock(),
    );

    match bridge.terminate(session) {
        Ok(t) if !t.is_clean() => {
            tracing::warn!(%session, "untrusted side did not release its session cleanly")
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(%session, error = %e, "terminate failed"),
    }

    served
}

fn serve_lines<H: HostCalls>(
    bridge: &Bridge<H>,
    session: SessionHandle,
    dtype: DType,
    capacity_hint: usize,
    classifier: Option<&SentimentClassifier>,
    input: impl BufRead,
    mut output: impl Write,
) -> Result<()> {
    for line in input.lines() {
        let line = line.context("reading stdin")?;
        let line = line.trim();
        if line == "quit" || line == "exit" {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let tensor = encode_tokens(line, dtype)?;
        let result = bridge
            .infer_to_vec(session, &tensor, capacity_hint)
            .context("infer")?;

        let embedding = decode_embedding(&result).context("decoding output")?;
        match classifier {
            Some(classifier) => {
                let verdict = classifier.classify(&embedding).context("classify")?;
                tracing::debug!(
                    sentiment = %verdict.sentiment,
                    positive = verdict.positive,
                    negative = verdict.negative,
                    "embedding classified"
                );
                writeln!(output, "{}", verdict.sentiment).context("writing stdout")?;
            }
            None => {
                let values: Vec<String> = embedding.iter().map(f32::to_string).collect();
                writeln!(output, "{}", values.join(", ")).context("writing stdout")?;
            }
        }
        output.flush().context("writing stdout")?;
    }
    Ok(())
}

/// Read positive and negative reference embeddings, one comma-separated line each.
fn load_references(path: &std::path::Path) -> Result<SentimentClassifier> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading references {}", path.display()))?;
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let (Some(positive), Some(negative)) = (lines.next(), lines.next()) else {
        bail!("reference file needs a positive and a negative embedding line");
    };
    let positive = parse_floats(positive)?;
    let negative = parse_floats(negative)?;
    SentimentClassifier::new(positive, negative).context("reference embeddings")
}

fn parse_floats(line: &str) -> Result<Vec<f32>> {
    line.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(parse::<f32>)
        .collect()
}

/// Encode comma-separated tokens as little-endian elements of `dtype`.
fn encode_tokens(line: &str, dtype: DType) -> Result<Vec<u8>> {
    let tokens = line.split(',').map(str::trim).filter(|t| !t.is_empty());
    let mut out = Vec::new();
    for token in tokens {
        match dtype {
            DType::I64 => out.extend_from_slice(&parse::<i64>(token)?.to_le_bytes()),
            DType::I32 => out.extend_from_slice(&parse::<i32>(token)?.to_le_bytes()),
            DType::U32 => out.extend_from_slice(&parse::<u32>(token)?.to_le_bytes()),
            DType::F32 => out.extend_from_slice(&parse::<f32>(token)?.to_le_bytes()),
            DType::F64 => out.extend_from_slice(&parse::<f64>(token)?.to_le_bytes()),
            other => bail!("cannot encode text tokens as {other}"),
        }
    }
    if out.is_empty() {
        bail!("no tokens on input line");
    }
    Ok(out)
}

fn parse<T>(token: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    token
        .parse()
        .with_context(|| format!("invalid token {token:?}"))
}
