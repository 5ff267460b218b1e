use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ferrous_classify::defaults::{MAX_ATTEMPTS, SPLIT_SIZE, VERBOSITY};
use ferrous_classify::job::{self, JobSpec};
use ferrous_classify::job_conf::{parse_define, JobConf};

#[derive(Parser)]
#[command(name = "ferrous-classify")]
#[command(about = "FerrousClassify - split-aware FASTA classification through an external alignment search", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every record of a FASTA corpus and reconcile results per key
    Run {
        /// Input FASTA file (.fa, .fasta, .fa.gz)
        #[arg(value_name = "CORPUS.FA")]
        input: PathBuf,

        /// Output directory; results go to part-00000
        #[arg(short = 'o', long, value_name = "DIR")]
        output: PathBuf,

        /// Job configuration entry, e.g. -D fasta.blastdb=nt (repeatable)
        #[arg(short = 'D', long = "define", value_name = "KEY=VALUE", value_parser = parse_define)]
        defines: Vec<(String, String)>,

        /// Properties file with KEY=VALUE lines; -D entries override it
        #[arg(short = 'c', long, value_name = "FILE")]
        conf: Option<PathBuf>,

        /// Maximum split size in bytes
        #[arg(short = 's', long, value_name = "BYTES", default_value_t = SPLIT_SIZE)]
        split_size: u64,

        /// Attempts per split before the job fails
        #[arg(short = 'm', long, value_name = "INT", default_value_t = MAX_ATTEMPTS)]
        max_attempts: u32,

        /// Number of concurrent map tasks (default: all available cores)
        #[arg(short = 't', long, value_name = "INT")]
        threads: Option<usize>,

        /// Verbose level: 1=error, 2=warning, 3=message, 4+=debugging
        #[arg(short = 'v', long, value_name = "INT", default_value_t = VERBOSITY)]
        verbosity: i32,
    },

    /// Show how a corpus would be split and how many records each split owns
    Splits {
        /// Input FASTA file
        #[arg(value_name = "CORPUS.FA")]
        input: PathBuf,

        /// Maximum split size in bytes
        #[arg(short = 's', long, value_name = "BYTES", default_value_t = SPLIT_SIZE)]
        split_size: u64,

        /// Verbose level: 1=error, 2=warning, 3=message, 4+=debugging
        #[arg(short = 'v', long, value_name = "INT", default_value_t = VERBOSITY)]
        verbosity: i32,
    },
}

fn init_logger(verbosity: i32) {
    let log_level = match verbosity {
        v if v <= 1 => log::LevelFilter::Error,
        2 => log::LevelFilter::Warn,
        3 => log::LevelFilter::Info,
        4 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            output,
            defines,
            conf,
            split_size,
            max_attempts,
            threads,
            verbosity,
        } => {
            init_logger(verbosity);

            let base = match conf {
                Some(path) => match JobConf::load_properties(&path) {
                    Ok(c) => c,
                    Err(e) => {
                        log::error!("Cannot load {}: {}", path.display(), e);
                        std::process::exit(1);
                    }
                },
                None => JobConf::new(),
            };
            let job_conf = base.merged(JobConf::from_pairs(defines));

            let mut num_threads = threads.unwrap_or_else(num_cpus::get);
            if num_threads < 1 {
                log::warn!("Invalid thread count {}, using 1 thread", num_threads);
                num_threads = 1;
            }
            if let Err(e) = rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
            {
                log::warn!(
                    "Failed to configure thread pool: {} (may already be initialized)",
                    e
                );
            }

            let thread_word = if num_threads == 1 { "thread" } else { "threads" };
            log::info!("Using {} {}", num_threads, thread_word);
            for (key, value) in job_conf.iter() {
                log::debug!("  {} = {}", key, value);
            }

            let mut spec = JobSpec::new(input, output, job_conf);
            spec.split_size = split_size;
            spec.max_attempts = max_attempts;

            match job::run_job(&spec) {
                Ok(summary) => {
                    log::info!("Results written to {}", summary.output.display());
                }
                Err(e) => {
                    log::error!("Job failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Splits {
            input,
            split_size,
            verbosity,
        } => {
            init_logger(verbosity);

            match job::inspect_splits(&input, split_size) {
                Ok(splits) => {
                    println!("offset\tlength\trecords");
                    for (split, records) in splits {
                        println!("{}\t{}\t{}", split.offset, split.length, records);
                    }
                }
                Err(e) => {
                    log::error!("Cannot inspect {}: {}", input.display(), e);
                    std::process::exit(1);
                }
            }
        }
    }
}
