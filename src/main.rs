//! objdetect-bench: times and cross-checks the argmax and upsampling kernels.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use objdetect_kernels::drivers;
use objdetect_kernels::{
    PoolConfig, TensorShape, ThreadPool, Timings, argmax, argmax_tensor_parallel, render_tensor,
    upsample,
};

#[derive(Parser, Debug)]
#[command(name = "objdetect-bench", version, about)]
struct Cli {
    /// Worker threads for the parallel kernels (0 = one per hardware thread).
    #[arg(short, long, global = true, default_value_t = 4)]
    threads: usize,

    /// Seed for the random tensors. Defaults to the current time.
    #[arg(short, long, global = true)]
    seed: Option<u64>,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the benchmark suite and print the timing table.
    Bench {
        /// Iterations per benchmark.
        #[arg(short, long, default_value_t = 1000)]
        cycles: u32,
    },

    /// Run both pipeline orders (upsample->argmax, argmax->upsample) and compare.
    Simulate {
        #[arg(short, long, default_value_t = 1000)]
        cycles: u32,
        #[arg(long, default_value_t = 28)]
        rows: usize,
        #[arg(long, default_value_t = 28)]
        columns: usize,
        #[arg(long, default_value_t = 21)]
        filters: usize,
        #[arg(long, default_value_t = 8)]
        scale: usize,
    },

    /// Cross-check the parallel kernel on random shapes and pool sizes.
    Verify {
        #[arg(short, long, default_value_t = 10)]
        rounds: usize,
        #[arg(long, default_value_t = 30)]
        max_threads: usize,
        #[arg(long, default_value_t = 256)]
        max_dim: usize,
    },

    /// Print small argmax and upsampling examples.
    Example,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn default_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let seed = cli.seed.unwrap_or_else(default_seed);
    info!(seed, threads = cli.threads, "starting");

    match cli.command {
        Command::Bench { cycles } => {
            let mut pool = ThreadPool::with_config(PoolConfig::with_threads(cli.threads))
                .context("failed to start thread pool")?;
            let mut timings = Timings::new();
            drivers::run_suite(cycles, seed, &mut pool, &mut timings)?;
            pool.shutdown()?;
            print!("{timings}");
        }
        Command::Simulate {
            cycles,
            rows,
            columns,
            filters,
            scale,
        } => {
            let mut pool = ThreadPool::new(cli.threads).context("failed to start thread pool")?;
            let mut timings = Timings::new();
            let shape = TensorShape::new(rows, columns, filters);
            drivers::simulate(shape, scale, cycles, seed, &mut pool, &mut timings)
                .with_context(|| format!("simulation of {shape} scaled by {scale} failed"))?;
            pool.shutdown()?;
            print!("{timings}");
        }
        Command::Verify {
            rounds,
            max_threads,
            max_dim,
        } => {
            let cases = drivers::verify_random(rounds, max_threads, max_dim, seed)?;
            for (i, case) in cases.iter().enumerate() {
                println!("{i:>3}: threads={:<3} shape={}", case.num_threads, case.shape);
            }
            println!("{} configurations match the sequential kernel", cases.len());
        }
        Command::Example => run_examples(cli.threads)?,
    }

    Ok(())
}

fn run_examples(threads: usize) -> Result<()> {
    let ints = [4i8, 1, 7, 5, 3, 8, 5, 1];
    if let Some(i) = argmax(&ints) {
        println!("Index : {i} - Value : {}", ints[i]);
    }
    let floats = [-4.0f32, 1.32, 7.12, 5.1, 3.0, -8.54, 5.0, 1.1];
    if let Some(i) = argmax(&floats) {
        println!("Index : {i} - Value : {}", floats[i]);
    }

    let shape = TensorShape::new(4, 3, 2);
    let scale = 5;
    let tensor: Vec<i32> = (1..=shape.len() as i32).collect();
    let mut scaled = vec![0; shape.upscaled(scale).len()];
    upsample(&tensor, &mut scaled, shape, scale)?;

    println!("Source tensor :");
    print!("{}", render_tensor(&tensor, shape));
    println!("Scaled-up tensor :");
    print!("{}", render_tensor(&scaled, shape.upscaled(scale)));

    let mut pool = ThreadPool::new(threads)?;
    let mut mat = vec![0usize; shape.cells()];
    argmax_tensor_parallel(&tensor, &mut mat, shape.filters, &mut pool)?;
    println!("Argmax over filters :");
    print!("{}", render_tensor(&mat, shape.reduced()));
    pool.shutdown()?;
    Ok(())
}
