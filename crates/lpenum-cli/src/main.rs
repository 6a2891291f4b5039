use clap::{Parser, Subcommand};
use lpenum_lang::{CompiledProblem, Compiler, Sense};
use lpenum_solver::{LogPrinter, Printer, SolutionStatus, SolveError, SolveRun, Solver, StdoutPrinter};
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lpenum")]
#[command(about = "Enumerate every optimal basis of a small linear program", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a problem file and output the AST
    Parse {
        /// The file to parse
        file: PathBuf,
        /// Output format (json, pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Solve a problem and output every optimal solution
    Solve {
        /// The file containing the problem
        file: PathBuf,
        /// Print every tableau and pivot the search visits
        #[arg(short, long)]
        trace: bool,
        /// Output format (json, pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
        /// Abandon branches deeper than this many pivots
        #[arg(long, default_value_t = 10_000)]
        max_depth: usize,
    },
    /// Check a problem file for errors
    Check {
        /// The file to check
        file: PathBuf,
    },
}

fn setup_logger(verbose: u8) -> Result<(), log::SetLoggerError> {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("{:<5} | {} | {}", record.level(), record.target(), message))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
}

fn read_source(file: &Path) -> String {
    match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            std::process::exit(1);
        }
    }
}

fn compile(file: &Path) -> CompiledProblem {
    let source = read_source(file);
    match Compiler::compile_source(&source) {
        Ok(problem) => problem,
        Err(e) => {
            eprintln!("Compile error: {}", e);
            std::process::exit(1);
        }
    }
}

fn sense_name(sense: Sense) -> &'static str {
    match sense {
        Sense::Maximize => "maximize",
        Sense::Minimize => "minimize",
    }
}

fn print_json(problem: &CompiledProblem, run: &SolveRun, errors: &[SolveError]) {
    let columns = problem.column_names();
    let solutions: Vec<_> = run
        .distinct_solutions()
        .iter()
        .map(|solution| {
            let values: serde_json::Map<String, serde_json::Value> = columns
                .iter()
                .cloned()
                .zip(solution.variables().iter().map(|&v| json!(v)))
                .collect();
            json!({
                "objective": problem.objective_for(solution.objective_value),
                "values": values,
            })
        })
        .collect();

    let report = json!({
        "status": run.status(),
        "method": run.method().to_string(),
        "sense": problem.sense,
        "outcomes": run.outcomes(),
        "optimal_tableaux": run.optimal_count(),
        "solutions": solutions,
        "errors": errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
    });
    match serde_json::to_string_pretty(&report) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("Error writing JSON: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_pretty(file: &Path, problem: &CompiledProblem, run: &SolveRun, errors: &[SolveError]) {
    run.print_results_with(&mut StdoutPrinter, |value| problem.objective_for(value));
    println!();
    println!("Problem: {}", file.display());
    println!("Variables: {}", problem.variables.join(", "));
    println!("Method: {}", run.method());
    println!();

    for error in errors {
        eprintln!("Abandoned branch: {}", error);
    }

    match run.status() {
        SolutionStatus::Optimal => {
            let distinct = run.distinct_solutions();
            println!("Status: OPTIMAL");
            if let Some(first) = distinct.first() {
                println!(
                    "Objective ({}): {:.2}",
                    sense_name(problem.sense),
                    problem.objective_for(first.objective_value)
                );
            }
            println!("Distinct optimal points: {}", distinct.len());
            for (i, solution) in distinct.iter().enumerate() {
                println!("  Point {}:", i + 1);
                for (name, value) in problem.variables.iter().zip(solution.variables()) {
                    println!("    {:20} {:10.2}", name, value);
                }
            }
        }
        SolutionStatus::Infeasible => {
            println!("Status: INFEASIBLE");
            println!("No solution exists that satisfies all constraints.");
        }
        SolutionStatus::Unbounded => {
            println!("Status: UNBOUNDED");
            println!("The problem has no finite optimal solution.");
        }
        SolutionStatus::Error => {
            println!("Status: ERROR");
            println!("Every branch was abandoned ({} in total).", run.outcomes().abandoned);
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = setup_logger(cli.verbose) {
        eprintln!("Error setting up logging: {}", e);
    }

    match cli.command {
        Commands::Parse { file, format } => {
            let source = read_source(&file);

            match lpenum_lang::Parser::parse(&source) {
                Ok(program) => {
                    if format == "json" {
                        match serde_json::to_string_pretty(&program) {
                            Ok(text) => println!("{}", text),
                            Err(e) => {
                                eprintln!("Error writing JSON: {}", e);
                                std::process::exit(1);
                            }
                        }
                    } else {
                        println!("{:#?}", program);
                    }
                }
                Err(e) => {
                    eprintln!("Parse error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Solve {
            file,
            trace,
            format,
            max_depth,
        } => {
            let problem = compile(&file);
            let solver = Solver::new().with_max_depth(max_depth);

            // The trace would corrupt JSON on stdout
            let mut printer: Box<dyn Printer> = if trace && format != "json" {
                Box::new(StdoutPrinter)
            } else {
                Box::new(LogPrinter)
            };
            let mut errors: Vec<SolveError> = Vec::new();
            let run = solver.solve_with(&problem.tableau, printer.as_mut(), &mut errors);

            if format == "json" {
                print_json(&problem, &run, &errors);
            } else {
                print_pretty(&file, &problem, &run, &errors);
            }

            if run.status() != SolutionStatus::Optimal {
                std::process::exit(1);
            }
        }
        Commands::Check { file } => {
            let source = read_source(&file);

            let program = match lpenum_lang::Parser::parse(&source) {
                Ok(program) => program,
                Err(e) => {
                    eprintln!("✗ {} has errors:", file.display());
                    eprintln!("  {}", e);
                    std::process::exit(1);
                }
            };

            match Compiler::new().compile(&program) {
                Ok(problem) => {
                    let solver = Solver::new();
                    println!("✓ {} is valid", file.display());
                    println!("  {} objective", sense_name(problem.sense));
                    println!("  {} variables", problem.variables.len());
                    println!("  {} constraints", program.constraints.len());
                    println!(
                        "  {}x{} tableau",
                        problem.tableau.row_count(),
                        problem.tableau.column_count()
                    );
                    println!("  method: {}", solver.determine_method(&problem.tableau));
                }
                Err(e) => {
                    eprintln!("✗ {} has errors:", file.display());
                    eprintln!("  {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
