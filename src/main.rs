//! codeswitch CLI: word-level language identification.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing::info;

use rust_codeswitch::config::parse_language_list;
use rust_codeswitch::{
    DictionaryClient, DictionaryServer, IdentifyConfig, Lexicon, VoteMethod, WhatlangOracle,
    identify, write_labels,
};

/// Output file used when the input is inline text.
const DEFAULT_OUTPUT: &str = "default.out";

#[derive(Parser)]
#[command(name = "codeswitch", version, about = "Word-level language identification")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Label every token of a text or a file with a language.
    Identify {
        /// Path to a UTF-8 text file, or the text itself.
        input: String,

        /// TOML settings file; flags below override it.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Tokens on each side of the target (window = 2r+1).
        #[arg(short = 'c', long = "ctxtsize")]
        window_radius: Option<usize>,

        /// Minimum global probability to keep a language (0 keeps all).
        #[arg(short = 'f', long = "fltrtresh")]
        filter_threshold: Option<f64>,

        /// Margin below the best language within which candidates stay viable.
        #[arg(short = 'g', long)]
        gap: Option<f64>,

        /// Vote method for ambiguous tokens: lgid, dico or full.
        #[arg(short = 'v', long)]
        vote: Option<VoteMethod>,

        /// Comma-separated subset of accepted languages.
        #[arg(short = 's', long)]
        subset: Option<String>,

        /// Dictionary service address.
        #[arg(long)]
        dictionary: Option<String>,

        /// Output file (default: `<input>.out`, or `default.out` for inline text).
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Also write the thresholded candidates of each token.
        #[arg(long)]
        details: bool,
    },

    /// Serve dictionaries over the lookup protocol.
    Serve {
        /// Directory with `<code>.aff`/`<code>.dic` or `<code>_words.txt` files.
        dict_dir: PathBuf,

        /// Address to listen on.
        #[arg(long, default_value = rust_codeswitch::config::DEFAULT_DICTIONARY_ADDRESS)]
        listen: String,

        /// Comma-separated languages to load (default: the model languages).
        #[arg(short = 's', long)]
        subset: Option<String>,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Identify {
            input,
            config,
            window_radius,
            filter_threshold,
            gap,
            vote,
            subset,
            dictionary,
            output,
            details,
        } => {
            let mut settings = match config {
                Some(path) => IdentifyConfig::load(&path)?,
                None => IdentifyConfig::default(),
            };
            if let Some(radius) = window_radius {
                settings.window_radius = radius;
            }
            if let Some(threshold) = filter_threshold {
                settings.filter_threshold = threshold;
            }
            if let Some(gap) = gap {
                settings.significance_gap = gap;
            }
            if let Some(vote) = vote {
                settings.vote_method = vote;
            }
            if let Some(subset) = subset {
                settings.languages = parse_language_list(&subset);
            }
            if let Some(address) = dictionary {
                settings.dictionary.address = address;
            }
            settings.normalize();
            settings.validate()?;

            let (text, default_output) = match std::fs::read_to_string(&input) {
                Ok(text) => {
                    info!(file = %input, "reading text file");
                    (text, PathBuf::from(format!("{input}.out")))
                }
                Err(_) => {
                    info!("input is not a readable file, analysing it as text");
                    (input, PathBuf::from(DEFAULT_OUTPUT))
                }
            };
            let output = output.unwrap_or(default_output);

            info!(
                window = settings.window_len(),
                filter_threshold = settings.filter_threshold,
                gap = settings.significance_gap,
                vote = %settings.vote_method,
                model = ?settings.model_languages,
                subset = ?settings.languages,
                "parameters"
            );

            let oracle = WhatlangOracle::new(&settings.model_languages)?;
            let client = DictionaryClient::from_config(&settings.dictionary);
            let analysis = identify(&text, &settings, &oracle, &client)?;

            let file = File::create(&output).into_diagnostic()?;
            write_labels(BufWriter::new(file), &analysis.labels, details).into_diagnostic()?;
            info!(
                tokens = analysis.labels.len(),
                output = %output.display(),
                "labels written"
            );
        }

        Commands::Serve {
            dict_dir,
            listen,
            subset,
        } => {
            let languages = match subset {
                Some(subset) => parse_language_list(&subset),
                None => IdentifyConfig::default().model_languages,
            };
            let lexicon = Lexicon::load(&dict_dir, &languages)?;
            let server = DictionaryServer::bind(&listen, lexicon)?;
            server.serve()?;
        }
    }

    Ok(())
}
