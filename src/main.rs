use clap::{Parser, Subcommand};
use icvm::api::{eval_code, Runtime};
use icvm::language::syntax;
use icvm::runtime::base::reducer::reduce_debug;
use icvm::runtime::batch;
use icvm::runtime::rule::op2;
use icvm::{analyze_safety, Config};
use std::time::Instant;

const DEMOS: &[(&str, &str)] = &[
  ("arith", include_str!("../demos/arith.hvm")),
  ("church", include_str!("../demos/church.hvm")),
  ("sum", include_str!("../demos/sum.hvm")),
  ("collapse", include_str!("../demos/collapse.hvm")),
  ("equal", include_str!("../demos/equal.hvm")),
  ("stream", include_str!("../demos/stream.hvm")),
];

#[derive(Subcommand)]
enum Command {
  /// Load a file and run its main definition
  #[command(aliases = &["r"])]
  Run {
    /// An ".hvm" file to load.
    file: String,
  },

  /// Evaluate an expression
  #[command(aliases = &["e"])]
  Eval {
    /// The expression to evaluate.
    expr: String,
  },

  /// Run the built-in scenario suite
  Test,

  /// Time a few built-in workloads
  Bench,

  /// Parse an expression and print its tree back
  Parse {
    /// The expression to parse.
    expr: String,
  },

  /// List the bundled example programs
  Examples,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Heap size, in 64-bit terms.
  #[arg(short = 's', long, default_value_t = icvm::runtime::default_heap_size())]
  size: usize,

  /// Worker threads for the parallel paths.
  #[arg(short = 't', long, default_value_t = 1)]
  tids: usize,

  /// Show interaction counts and timing.
  #[arg(short = 'c', long, default_value_t = false)]
  cost: bool,

  /// Print each reduction step of the root.
  #[arg(short = 'd', long, default_value_t = false)]
  debug: bool,

  /// Enumerate superposed results instead of printing one normal form.
  #[arg(short = 'k', long, default_value_t = false)]
  collapse: bool,

  /// Maximum number of results to enumerate with --collapse.
  #[arg(short = 'n', long, default_value_t = 64)]
  limit: usize,

  #[command(subcommand)]
  command: Command,
}

fn config_of(cli: &Cli) -> Config {
  let mut cfg = Config::default();
  cfg.heap_size = cli.size;
  cfg.num_workers = if cli.debug { 1 } else { cli.tids };
  cfg
}

fn run_code(cli: &Cli, code: &str, expr: &str) -> Result<(), String> {
  let cfg = config_of(cli);
  let mut runtime = Runtime::from_code_with(cfg, code)?;

  if let Ok(term) = syntax::read_term(expr) {
    let safety = analyze_safety(&term);
    if safety != icvm::Safety::Safe {
      eprintln!("safety: {}", safety);
    }
  }

  let start = Instant::now();
  if cli.collapse {
    for result in runtime.collapse(expr, cli.limit)? {
      println!("{}", result);
    }
  } else {
    if cli.debug {
      let host = runtime.alloc_term(&syntax::read_term(expr)?)?;
      let term = reduce_debug(&runtime.state, runtime.state.heap.load(host))
        .map_err(|err| err.to_string())?;
      runtime.state.heap.link(host, term);
    }
    println!("{}", runtime.eval(expr)?);
  }
  let time = start.elapsed().as_secs_f64();

  if cli.cost {
    let stats = runtime.stats();
    eprintln!();
    eprintln!(
      "\x1b[32m[TIME: {:.2}s | COST: {} | RPS: {:.2}m]\x1b[0m",
      time,
      stats.interactions,
      stats.interactions as f64 / time / 1_000_000.0
    );
    if stats.commutation_flagged {
      eprintln!("\x1b[33m[commutation limit exceeded]\x1b[0m");
    }
  }
  Ok(())
}

fn run_tests(cli: &Cli) -> Result<(), String> {
  let scenarios: &[(&str, &str)] = &[
    ("(+ #21 #21)", "#42"),
    ("(* (+ #2 #3) (- #10 #4))", "#30"),
    ("((\\x.x) #7)", "#7"),
    ("!&0{a,b}=&0{#1,#2}; (+ a b)", "#3"),
    ("!&0{a,b}=&1{#1,#2}; (+ a b)", "&1{#2,#4}"),
    ("(=== #42 #42)", "#1"),
    ("(=== #42 #7)", "#0"),
  ];
  let mut failed = 0;
  for (expr, expected) in scenarios {
    match eval_code("", expr, config_of(cli)) {
      Ok((got, _)) if got == *expected => println!("PASS {}", expr),
      Ok((got, _)) => {
        println!("FAIL {} => {} (expected {})", expr, got, expected);
        failed += 1;
      }
      Err(err) => {
        println!("FAIL {} => error: {}", expr, err);
        failed += 1;
      }
    }
  }
  let mut runtime = Runtime::new(config_of(cli));
  let got = runtime.collapse("&0{&0{#1,#2},&0{#3,#4}}", 8)?;
  if got == ["#1", "#2", "#3", "#4"] {
    println!("PASS collapse order");
  } else {
    println!("FAIL collapse order => {:?}", got);
    failed += 1;
  }
  if failed > 0 {
    return Err(format!("{} scenario(s) failed", failed));
  }
  Ok(())
}

fn run_bench(cli: &Cli) -> Result<(), String> {
  let mut cfg = config_of(cli);
  cfg.heap_size = cfg.heap_size.max(256 * icvm::CELLS_PER_MB);

  let start = Instant::now();
  let (norm, stats) = eval_code(include_str!("../demos/sum.hvm"), "(@sum #16)", cfg)?;
  let time = start.elapsed().as_secs_f64();
  println!("sum-tree:  {} in {:.3}s ({:.2}m rewrites/s)", norm, time, stats.interactions as f64 / time / 1_000_000.0);

  let n = 1 << 20;
  let a: Vec<u32> = (0..n as u32).collect();
  let b: Vec<u32> = (0..n as u32).map(|x| x.wrapping_mul(3)).collect();
  let mut out = vec![0u32; n];
  let start = Instant::now();
  batch::batch_op(op2::ADD, &a, &b, &mut out).map_err(|err| err.to_string())?;
  let time = start.elapsed().as_secs_f64();
  println!("batch-add: {} lanes in {:.3}s", n, time);

  let start = Instant::now();
  batch::parallel_batch_op(op2::ADD, &a, &b, &mut out, cli.tids.max(2))
    .map_err(|err| err.to_string())?;
  let time = start.elapsed().as_secs_f64();
  println!("batch-add: {} lanes in {:.3}s ({} workers)", n, time, cli.tids.max(2));
  Ok(())
}

fn run_cli() -> Result<(), String> {
  let cli = Cli::parse();
  match &cli.command {
    Command::Run { file } => {
      let code = std::fs::read_to_string(file).map_err(|err| err.to_string())?;
      run_code(&cli, &code, "@main")
    }
    Command::Eval { expr } => run_code(&cli, "", expr),
    Command::Test => run_tests(&cli),
    Command::Bench => run_bench(&cli),
    Command::Parse { expr } => {
      let term = syntax::read_term(expr)?;
      println!("{}", term.show());
      Ok(())
    }
    Command::Examples => {
      for (name, code) in DEMOS {
        println!("// {}", name);
        print!("{}", code);
        println!();
      }
      Ok(())
    }
  }
}

fn main() {
  if let Err(err) = run_cli() {
    eprintln!("{}", err);
    std::process::exit(1);
  }
}
