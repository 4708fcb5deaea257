extern crate clap;

use clap::{App, Arg};
use crossword_solver::{load_font, save, ConstraintEngine, PuzzleStructure, Rendered};
use log::warn;
use std::process;

fn main() {
    env_logger::init();

    let matches = App::new("run")
        .about("Fill a crossword structure from a word list")
        .arg(
            Arg::with_name("structure")
                .value_name("STRUCTURE")
                .help("Grid file; '_' marks a fillable cell")
                .required(true),
        )
        .arg(
            Arg::with_name("words")
                .value_name("WORDS")
                .help("Word list, one word per line")
                .required(true),
        )
        .arg(
            Arg::with_name("output")
                .value_name("OUTPUT")
                .help("Also draw the filled grid to this image file"),
        )
        .arg(
            Arg::with_name("font")
                .short("f")
                .long("font")
                .value_name("FILE")
                .help("Font used for letters in the image")
                .default_value("assets/fonts/OpenSans-Regular.ttf"),
        )
        .arg(
            Arg::with_name("stats")
                .short("s")
                .long("stats")
                .help("Print the number of guesses taken")
                .takes_value(false),
        )
        .get_matches();

    let structure = matches.value_of("structure").unwrap();
    let words = matches.value_of("words").unwrap();

    let structure = match PuzzleStructure::from_files(structure, words) {
        Ok(structure) => structure,
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    };

    let mut engine = ConstraintEngine::new(&structure);
    let solution = engine.solve();
    if matches.is_present("stats") {
        eprintln!("{} guesses", engine.num_guesses());
    }

    let assignment = match solution {
        Some(assignment) => assignment,
        None => {
            println!("No solution.");
            process::exit(0);
        }
    };
    print!("{}", Rendered::new(&structure, &assignment));

    if let Some(output) = matches.value_of("output") {
        let font = match load_font(matches.value_of("font").unwrap()) {
            Ok(font) => Some(font),
            Err(err) => {
                warn!("{}; drawing without letters", err);
                None
            }
        };

        if let Err(err) = save(&structure, &assignment, font.as_ref(), output) {
            eprintln!("{}", err);
            process::exit(1);
        }
    }
}
