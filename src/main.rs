//! Binary entry point: parse `-t`/`-s`, build the requested table, and
//! hand it to the line-oriented REPL.

mod cli;
mod repl;

use hashtbl::HashTable;

fn main() {
    let options = cli::parse_options();
    let table = HashTable::new(options.kind, options.size)
        .expect("CLI validation already rejected non-positive sizes");
    repl::run(table);
}
