//! Command-line option parsing: `-t <type>` and `-s <n>`, matching the
//! original interpreter's two flags. Validation failures print a usage
//! message to stderr and exit non-zero, independent of which flag was
//! missing or invalid.

use clap::Parser;

use hashtbl::{HashTableError, TableKind};

#[derive(Parser, Debug)]
#[command(name = "hashtbl", about = "interactive cuckoo / extendible-N / xuckoo hash table shell")]
struct Args {
    /// table type: 0|cuckoo, 1|xtndbln, 2|xuckoo
    #[arg(short = 't', long = "type")]
    table_type: Option<String>,

    /// initial inner-table size (cuckoo) or bucket capacity (extendible-N); ignored for xuckoo
    #[arg(short = 's', long = "size", default_value_t = 0)]
    size: i64,
}

pub struct Options {
    pub kind: TableKind,
    pub size: i64,
}

/// Validates parsed arguments, returning the two recoverable-at-construction
/// errors from `HashTableError` rather than exiting directly, so the CLI's
/// unknown-scheme/non-positive-size paths actually construct the error
/// variants they're documented to produce.
fn validate(args: &Args) -> Result<(TableKind, i64), HashTableError> {
    let kind = TableKind::parse(args.table_type.as_deref().unwrap_or(""))
        .ok_or_else(|| HashTableError::UnknownScheme(args.table_type.clone().unwrap_or_default()))?;

    if args.size <= 0 {
        return Err(HashTableError::NonPositiveSize(args.size));
    }

    Ok((kind, args.size))
}

/// Parses `std::env::args`, exiting the process with a usage message on
/// stderr if the table type is missing/unrecognized or the size is not
/// positive.
pub fn parse_options() -> Options {
    let args = Args::parse();

    match validate(&args) {
        Ok((kind, size)) => Options { kind, size },
        Err(err @ HashTableError::UnknownScheme(_)) => {
            eprintln!("{err}");
            eprintln!("please specify which table type to use, using the -t flag:");
            eprintln!(" -t 0 or cuckoo:  cuckoo hash table");
            eprintln!(" -t 1 or xtndbln: n-key extendible hash table");
            eprintln!(" -t 2 or xuckoo:  extendible cuckoo table");
            std::process::exit(1);
        }
        Err(err @ HashTableError::NonPositiveSize(_)) => {
            eprintln!("{err}");
            eprintln!("please specify initial table size (>0) using the -s flag");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(table_type: Option<&str>, size: i64) -> Args {
        Args { table_type: table_type.map(str::to_owned), size }
    }

    #[test]
    fn missing_type_is_unknown_scheme() {
        assert_eq!(validate(&args(None, 4)), Err(HashTableError::UnknownScheme(String::new())));
    }

    #[test]
    fn unrecognized_type_is_unknown_scheme() {
        assert_eq!(validate(&args(Some("bogus"), 4)), Err(HashTableError::UnknownScheme("bogus".into())));
    }

    #[test]
    fn non_positive_size_is_rejected() {
        assert_eq!(validate(&args(Some("cuckoo"), 0)), Err(HashTableError::NonPositiveSize(0)));
        assert_eq!(validate(&args(Some("cuckoo"), -1)), Err(HashTableError::NonPositiveSize(-1)));
    }

    #[test]
    fn valid_args_parse() {
        assert_eq!(validate(&args(Some("xuckoo"), 1)), Ok((TableKind::Xuckoo, 1)));
    }
}
