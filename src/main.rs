//! Punto de entrada ("driver").
//!
//! Este módulo orquesta las diferentes fases del proceso de
//! compilación y expone una CLI.

use anyhow::{bail, Context};
use clap::{crate_version, Arg, Command};
use stackcc::{
    error::Diagnostics,
    link::{LinkOptions, Linker, DEFAULT_LINKER},
    source::Source,
    target::{self, Dialect},
    vm::Machine,
};

use std::{
    fs::File,
    io::{self, Write},
    process,
};

use tracing::{debug, info, Level};

fn main() -> anyhow::Result<()> {
    // Parsing de CLI
    let args = Command::new("stackcc")
        .version(crate_version!())
        .about("Compiles arithmetic expressions to x86-64 assembly")
        .arg(
            Arg::new("source")
                .value_name("SOURCE")
                .required(true)
                .allow_hyphen_values(true)
                .help("Program text, or '-' to read it from stdin"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .takes_value(true)
                .value_name("FILE")
                .default_value("-")
                .help("Output file ('-' for stdout)"),
        )
        .arg(
            Arg::new("syntax")
                .long("syntax")
                .takes_value(true)
                .value_name("DIALECT")
                .default_value("intel")
                .help("Assembly syntax, either 'intel' or 'att'"),
        )
        .arg(
            Arg::new("executable")
                .short('c')
                .long("executable")
                .help("Assemble and link an executable instead of emitting assembly"),
        )
        .arg(
            Arg::new("strip")
                .short('s')
                .long("strip")
                .requires("executable")
                .help("Strip executables"),
        )
        .arg(
            Arg::new("static")
                .long("static")
                .requires("executable")
                .help("Link executables statically"),
        )
        .arg(
            Arg::new("linker")
                .long("linker")
                .takes_value(true)
                .value_name("CMD")
                .default_value(DEFAULT_LINKER)
                .help("C compiler driver used to assemble and link"),
        )
        .arg(
            Arg::new("eval")
                .long("eval")
                .conflicts_with("executable")
                .help("Interpret the program and print its result"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .multiple_occurrences(true)
                .help("Increase logging verbosity"),
        )
        .get_matches();

    // Los logs van a stderr, stdout puede llevar ensamblador
    let level = match args.occurrences_of("verbose") {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();

    // Se extraen argumentos necesarios
    let dialect: Dialect = args.value_of_t("syntax").unwrap_or_else(|error| error.exit());
    let executable = args.is_present("executable");
    let output = args.value_of("output").unwrap_or("-");

    let source = match args.value_of("source").unwrap_or("-") {
        "-" => Source::read(io::stdin().lock(), "<stdin>")
            .context("Failed to read program from stdin")?,

        text => Source::new("<argument>", text),
    };

    let program = match stackcc::compile(&source) {
        Ok(program) => program,
        Err(diagnostics) => fail(diagnostics),
    };

    info!(
        source = source.name(),
        instructions = program.code.len(),
        "compiled"
    );

    if args.is_present("eval") {
        let result = Machine::default()
            .run(&program)
            .context("Program failed during evaluation")?;

        println!("{}", result);
        return Ok(());
    }

    // Nada se escribe hasta que todo el ensamblador esté listo
    let mut assembly = Vec::new();
    target::emit(&program, dialect, &mut assembly).context("Failed to emit assembly")?;

    match (executable, output) {
        // Ensamblador a stdout
        (false, "-") => {
            let stdout = io::stdout();
            let mut stdout = stdout.lock();

            stdout
                .write_all(&assembly)
                .and_then(|()| stdout.flush())
                .context("Failed to emit to stdout")?;
        }

        // Ensamblador a archivo
        (false, path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to open for writing: {}", path))?;

            file.write_all(&assembly)
                .with_context(|| format!("Failed to emit to file: {}", path))?;
        }

        // Ejecutable a stdout
        (true, "-") => bail!("Refusing to write executable to stdout"),

        // Ejecutable a archivo
        (true, path) => {
            let mut options = LinkOptions::empty();
            if args.is_present("strip") {
                options |= LinkOptions::STRIP;
            }

            if args.is_present("static") {
                options |= LinkOptions::STATIC;
            }

            let linker = args.value_of("linker").unwrap_or(DEFAULT_LINKER);
            let mut linker = Linker::spawn(linker, &path, options).context("Failed to link")?;

            linker
                .stdin()
                .write_all(&assembly)
                .context("Failed to emit assembly to assembler")?;

            linker
                .finish()
                .with_context(|| format!("Failed to generate executable: {}", path))?;
        }
    };

    Ok(())
}

/// Reporta un error de compilación y termina el proceso.
fn fail(diagnostics: Diagnostics) -> ! {
    debug!(
        kind = diagnostics.kind_name(),
        location = %diagnostics.location(),
        "compilation failed"
    );

    eprint!("{}", diagnostics);
    process::exit(1)
}
