use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};

use bigram_llm::{
    config::Config,
    constants,
    dataset::{read_corpus, DataSet},
    device::{select_device, DeviceChoice},
    generate::Generator,
    tokenizer::Vocabulary,
    train::Trainer,
};

/// Train a character-level bigram model on a text file and sample from it.
#[derive(Parser, Debug)]
#[command(name = "bigram-llm", version, about)]
struct Cli {
    /// UTF-8 text corpus.
    #[arg(long, default_value = constants::INPUT_PATH)]
    input: PathBuf,
    #[arg(long, default_value_t = constants::BATCH_SIZE)]
    batch_size: usize,
    #[arg(long, default_value_t = constants::BLOCK_SIZE)]
    block_size: usize,
    #[arg(long, default_value_t = constants::EMBEDDING_DIM)]
    n_embd: usize,
    #[arg(long, default_value_t = constants::MAX_ITERS)]
    max_iters: usize,
    #[arg(long, default_value_t = constants::EVAL_INTERVAL)]
    eval_interval: usize,
    #[arg(long, default_value_t = constants::EVAL_ITERS)]
    eval_iters: usize,
    #[arg(long, default_value_t = constants::LEARNING_RATE)]
    learning_rate: f64,
    #[arg(long, default_value_t = constants::TRAIN_VALIDATION_SPLIT)]
    train_fraction: f64,
    #[arg(long, default_value_t = constants::SEED)]
    seed: u64,
    #[arg(long, default_value_t = constants::MAX_NEW_TOKENS)]
    max_new_tokens: usize,
    #[arg(long, default_value_t = constants::TEMPERATURE)]
    temperature: f64,
    #[arg(long, value_enum, default_value_t = DeviceChoice::Auto)]
    device: DeviceChoice,
    /// Preload this libtorch_cuda.so before probing for CUDA.
    #[arg(long)]
    cuda_library: Option<PathBuf>,
    /// Text to continue; generation starts from token 0 when omitted.
    #[arg(long)]
    prompt: Option<String>,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            input_path: self.input.clone(),
            batch_size: self.batch_size,
            block_size: self.block_size,
            n_embd: self.n_embd,
            max_iters: self.max_iters,
            eval_interval: self.eval_interval,
            eval_iters: self.eval_iters,
            learning_rate: self.learning_rate,
            train_fraction: self.train_fraction,
            seed: self.seed,
            max_new_tokens: self.max_new_tokens,
            temperature: self.temperature,
            device: self.device,
            cuda_library: self.cuda_library.clone(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = cli.config();
    config.validate()?;

    let device = select_device(config.device, config.cuda_library.as_deref())?;
    log::info!("using device {device:?}");
    tch::manual_seed(config.seed as i64);
    let mut rng = StdRng::seed_from_u64(config.seed);

    let text = read_corpus(&config.input_path)?;
    let vocab = Vocabulary::build(&text);
    log::info!(
        "read {} characters, vocabulary of {}",
        text.chars().count(),
        vocab.vocab_size()
    );
    let encoded = vocab.encode(&text)?;
    let dataset = DataSet::new(&encoded, &config).context("corpus too short for block size")?;

    let mut trainer = Trainer::new(&config, vocab.vocab_size(), device)?;
    log::info!("{} trainable parameters", trainer.num_parameters());
    trainer.train(&dataset, &mut rng)?;

    let generator = Generator::new(trainer.model(), &config);
    let text = generator.generate_text(
        &vocab,
        cli.prompt.as_deref(),
        config.max_new_tokens,
        &mut rng,
        trainer.device(),
    )?;
    println!("{}", text);
    Ok(())
}
