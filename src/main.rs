//! Evosort CLI - Evolve sorting programs until interrupted.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::io::BufRead;
use std::sync::atomic::Ordering;
use std::thread;

use evosort::{
    EvolutionEngine,
    schema::{EvolutionConfig, FinalReport, GenerationReport},
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.get(1).is_some_and(|a| a == "--example") {
        print_example_config();
        return;
    }
    if args.get(1).is_some_and(|a| a == "--help" || a == "-h") {
        print_usage(&args[0]);
        return;
    }

    // Load configuration
    let mut config = match args.get(1) {
        Some(path) => EvolutionConfig::from_json_file(path).unwrap_or_else(|e| {
            eprintln!("Error loading config {}: {}", path, e);
            std::process::exit(1);
        }),
        None => EvolutionConfig::default(),
    };

    if let Some(arg) = args.get(2) {
        let generations: usize = arg.parse().unwrap_or_else(|e| {
            eprintln!("Invalid generation count {:?}: {}", arg, e);
            std::process::exit(1);
        });
        config.population.max_generations = Some(generations);
    }

    println!("Evosort");
    println!("=======");
    println!("Initial programs: {}", config.population.initial_size);
    println!(
        "Survivors: {} ({} offspring per generation)",
        config.population.survivors,
        config.population.offspring_count()
    );
    match config.execution.interrupt_at {
        Some(cap) => println!("Step cap: {}", cap),
        None => println!(
            "Interruption chance: {}",
            config.execution.chance_of_interruption
        ),
    }
    if let Some(seed) = config.random_seed {
        println!("Seed: {}", seed);
    }
    println!();
    println!("Press Enter to stop and run the final evaluation.");

    let mut engine = EvolutionEngine::new(config);

    // Any line (or EOF) on stdin cancels the run.
    let cancel = engine.cancel_handle();
    thread::spawn(move || {
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) => log::debug!("Stdin closed, cancelling"),
            Ok(_) => {}
            Err(e) => log::debug!("Reading stdin failed, cancelling: {}", e),
        }
        cancel.store(true, Ordering::Relaxed);
    });

    let result = engine.run_with_callback(print_generation);

    println!();
    println!(
        "Stopped after {} generations ({:?}). Computing scores in lax conditions.",
        result.generations, result.stop_reason
    );
    print_final(&result.final_report);
    println!("Total time: {:.2}s", result.elapsed_seconds);
}

fn print_generation(report: &GenerationReport) {
    println!();
    println!("Generation {}", report.generation);
    println!(
        "Executed {} programs on lists of length {:?}.",
        report.evaluated, report.list_sizes
    );
    println!("Lowest score = {:.4}", report.lowest_score);
    println!("Highest scores, execution lengths, code sizes =");
    for entry in &report.survivors {
        println!(
            "  {:.4}, {}, {}",
            entry.score, entry.execution_length, entry.code_size
        );
    }
    println!("Computer execution length = {:.3}s", report.elapsed_seconds);
}

fn print_final(report: &FinalReport) {
    println!();
    println!("Executed on a list of length {}.", report.list_size);
    println!("Lowest score = {:.4}", report.lowest_score);
    println!("Highest scores, execution lengths, code sizes =");
    for entry in &report.survivors {
        println!(
            "  {:.4}, {}, {}",
            entry.summary.score, entry.summary.execution_length, entry.summary.code_size
        );
    }
    if let Some(best) = report.survivors.first() {
        println!();
        println!("Best program:");
        print!("{}", best.program);
    }
    println!("Computer execution length = {:.3}s", report.elapsed_seconds);
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [config.json] [max_generations]", program);
    eprintln!();
    eprintln!("Evolve VM programs that sort lists.");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  config.json      Path to evolution configuration (default: built-in)");
    eprintln!("  max_generations  Stop after this many generations (default: until Enter)");
    eprintln!();
    eprintln!("Print the default configuration with --example.");
}

fn print_example_config() {
    let config = EvolutionConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}
