//! Text and image rendering of a filled grid.

use ab_glyph::FontArc;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::{Assignment, Error, PsResult, PuzzleStructure};

/// The character printed for a blocked cell.
const BLOCK: char = '█';

const CELL_SIZE: u32 = 100;
const CELL_BORDER: u32 = 2;
const FONT_SIZE: f32 = 80.0;

// Letters sit this many pixels above the centre of their cell.
const TEXT_LIFT: i32 = 10;

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Lay the words of an assignment out on the grid.
///
/// Cells no assigned slot covers are None.
pub fn letter_grid(structure: &PuzzleStructure, assignment: &Assignment) -> Vec<Vec<Option<char>>> {
    let mut letters = vec![vec![None; structure.width()]; structure.height()];

    for (slot, word) in assignment.iter() {
        for ((row, col), letter) in slot.cells().zip(word.chars()) {
            if let Some(cell) = letters.get_mut(row).and_then(|r| r.get_mut(col)) {
                *cell = Some(letter);
            }
        }
    }

    letters
}

/// A grid with its letters filled in, ready to print.
///
/// # Examples
///
/// ```
/// use crossword_solver::{ConstraintEngine, PuzzleStructure, Rendered};
///
/// let structure = PuzzleStructure::parse("___\n#_#\n#_#\n", "CAT\nACT\n").unwrap();
/// let mut engine = ConstraintEngine::new(&structure);
/// let assignment = engine.solve().unwrap();
/// assert_eq!(Rendered::new(&structure, &assignment).to_string(), "ACT\n█A█\n█T█\n");
/// ```
pub struct Rendered<'a> {
    structure: &'a PuzzleStructure,
    letters: Vec<Vec<Option<char>>>,
}

impl<'a> Rendered<'a> {
    pub fn new(structure: &'a PuzzleStructure, assignment: &Assignment) -> Self {
        Rendered {
            structure,
            letters: letter_grid(structure, assignment),
        }
    }
}

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (row, cells) in self.letters.iter().enumerate() {
            for (col, letter) in cells.iter().enumerate() {
                let c = if self.structure.is_fillable(row, col) {
                    letter.unwrap_or(' ')
                } else {
                    BLOCK
                };
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Load a TrueType or OpenType font for drawing letters.
pub fn load_font<P: AsRef<Path>>(path: P) -> PsResult<FontArc> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    FontArc::try_from_vec(data).map_err(|source| Error::Font {
        path: path.to_path_buf(),
        source,
    })
}

/// Draw the grid as an image, one square cell per grid cell.
///
/// Blocked cells are black, fillable cells white with a black border.
/// Letters are only drawn when a font is given.
pub fn draw(
    structure: &PuzzleStructure,
    assignment: &Assignment,
    font: Option<&FontArc>,
) -> RgbaImage {
    let letters = letter_grid(structure, assignment);
    let interior = CELL_SIZE - 2 * CELL_BORDER;
    let mut img = RgbaImage::from_pixel(
        structure.width() as u32 * CELL_SIZE,
        structure.height() as u32 * CELL_SIZE,
        BLACK,
    );

    for (row, cells) in letters.iter().enumerate() {
        for (col, letter) in cells.iter().enumerate() {
            if !structure.is_fillable(row, col) {
                continue;
            }

            let x = (col as u32 * CELL_SIZE + CELL_BORDER) as i32;
            let y = (row as u32 * CELL_SIZE + CELL_BORDER) as i32;
            draw_filled_rect_mut(&mut img, Rect::at(x, y).of_size(interior, interior), WHITE);

            if let (Some(font), Some(letter)) = (font, letter) {
                let text = letter.to_string();
                let (w, h) = text_size(FONT_SIZE, font, &text);
                let dx = (interior as i32 - w as i32) / 2;
                let dy = (interior as i32 - h as i32) / 2 - TEXT_LIFT;
                draw_text_mut(&mut img, BLACK, x + dx, y + dy, FONT_SIZE, font, &text);
            }
        }
    }

    img
}

/// Draw the grid and write it to an image file.  The format follows the
/// file extension.
pub fn save<P: AsRef<Path>>(
    structure: &PuzzleStructure,
    assignment: &Assignment,
    font: Option<&FontArc>,
    path: P,
) -> PsResult<()> {
    let path = path.as_ref();
    draw(structure, assignment, font)
        .save(path)
        .map_err(|source| Error::Image {
            path: path.to_path_buf(),
            source,
        })
}
