//! Command-line front end: compiles a `.wat` file to a `.wasm` module.

use luna::file_output::{write_module, DEFAULT_OUTPUT};
use luna::{emitter, wat, Mode, Options};
use std::error::Error;
use std::fs;
use std::process;

const USAGE: &str = "Usage: luna <input.wat> [-o out.wasm] [--strict] [--unquote] [--config options.json] \
                     [--emit tokens|ast|text|hex]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emit {
    Wasm,
    Tokens,
    Ast,
    Text,
    Hex,
}

#[derive(Debug)]
struct Args {
    input: String,
    output: String,
    options: Options,
    emit: Emit,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut input = None;
    let mut output = DEFAULT_OUTPUT.to_string();
    let mut config = None;
    let mut strict = false;
    let mut unquote = false;
    let mut emit = Emit::Wasm;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-o" | "--output" => output = iter.next().ok_or("-o needs a path")?.clone(),
            "--config" => config = Some(iter.next().ok_or("--config needs a path")?.clone()),
            "--strict" => strict = true,
            "--unquote" => unquote = true,
            "--emit" => {
                emit = match iter.next().map(String::as_str) {
                    Some("tokens") => Emit::Tokens,
                    Some("ast") => Emit::Ast,
                    Some("text") => Emit::Text,
                    Some("hex") => Emit::Hex,
                    Some("wasm") => Emit::Wasm,
                    other => return Err(format!("unknown --emit value: {other:?}")),
                }
            }
            flag if flag.starts_with('-') => return Err(format!("unknown flag: {flag}")),
            path if input.is_none() => input = Some(path.to_string()),
            extra => return Err(format!("unexpected argument: {extra}")),
        }
    }

    // Flags on the command line override the config file
    let mut options = match config {
        Some(path) => Options::from_file(&path).map_err(|e| format!("{path}: {e}"))?,
        None => Options::default(),
    };
    if strict {
        options.mode = Mode::Strict;
    }
    if unquote {
        options.unquote_exports = true;
    }

    Ok(Args {
        input: input.ok_or("no input file")?,
        output,
        options,
        emit,
    })
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let source = fs::read_to_string(&args.input)?;
    let options = &args.options;

    if args.emit == Emit::Text {
        println!("{}", luna::compile_to_text_with(&source, options)?);
        return Ok(());
    }

    let tokens = wat::tokenize_with(&source, options)?;
    if args.emit == Emit::Tokens {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
        return Ok(());
    }

    let statements = wat::parse_with(tokens, options)?;
    if args.emit == Emit::Ast {
        println!("{}", serde_json::to_string_pretty(&statements)?);
        return Ok(());
    }

    let bytes = emitter::emit_with(&statements, options)?;
    if args.emit == Emit::Hex {
        println!("{}", hex::encode(&bytes));
    } else {
        write_module(&bytes, &args.output)?;
        println!("Wrote {} bytes to {}", bytes.len(), args.output);
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("{USAGE}");
            process::exit(1);
        }
    };

    if let Err(e) = run(args) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
