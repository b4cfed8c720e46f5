//! Line-oriented command interpreter: reads `i N`, `l N`, `p`, `s`, `h`, `q`
//! from stdin until EOF or `q`.

use std::io::{self, BufRead};

use hashtbl::HashTable;

const MAX_LINE_LEN: usize = 80;

pub fn run(mut table: HashTable) {
    println!("enter a command (h for help):");

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(mut line) = line else { break };
        line.truncate(MAX_LINE_LEN);

        let mut parts = line.trim().splitn(2, char::is_whitespace);
        let Some(op) = parts.next().and_then(|s| s.chars().next()) else {
            continue;
        };
        let arg = parts.next().map(str::trim);

        match op {
            'i' => match parse_key(arg) {
                Some(key) => {
                    if table.insert(key) {
                        println!("{key} inserted");
                    } else {
                        println!("{key} already in table");
                    }
                }
                None => println!("syntax: i number"),
            },
            'l' => match parse_key(arg) {
                Some(key) => {
                    if table.lookup(key) {
                        println!("{key} found");
                    } else {
                        println!("{key} not found");
                    }
                }
                None => println!("syntax: l number"),
            },
            'p' => println!("{table}"),
            's' => println!("{}", table.stats_report()),
            'q' => {
                println!("exiting");
                return;
            }
            'h' => print_operations(),
            other => {
                println!("unknown operation '{other}'");
                print_operations();
            }
        }
    }
}

fn parse_key(arg: Option<&str>) -> Option<u64> {
    arg.filter(|s| !s.is_empty())?.parse().ok()
}

fn print_operations() {
    println!("available operations:");
    println!(" i number: insert 'number' into table");
    println!(" l number: lookup is 'number' in table");
    println!(" p: print table");
    println!(" s: print stats");
    println!(" q: quit");
}
