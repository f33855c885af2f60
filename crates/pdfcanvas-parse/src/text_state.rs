//! Text object state: the text matrix and text line matrix.
//!
//! These live outside the graphics state; `BT` resets them and they are not
//! saved by `q`.

use pdfcanvas_core::Matrix;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextObjectState {
    text_matrix: Matrix,
    line_matrix: Matrix,
    in_text_object: bool,
}

impl Default for TextObjectState {
    fn default() -> Self {
        Self {
            text_matrix: Matrix::identity(),
            line_matrix: Matrix::identity(),
            in_text_object: false,
        }
    }
}

impl TextObjectState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text_matrix(&self) -> Matrix {
        self.text_matrix
    }

    pub fn line_matrix(&self) -> Matrix {
        self.line_matrix
    }

    pub fn in_text_object(&self) -> bool {
        self.in_text_object
    }

    /// `BT`
    pub fn begin(&mut self) {
        self.text_matrix = Matrix::identity();
        self.line_matrix = Matrix::identity();
        self.in_text_object = true;
    }

    /// `ET`
    pub fn end(&mut self) {
        self.in_text_object = false;
    }

    /// `Td`: start a new line offset from the start of the current one.
    pub fn move_text_position(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Matrix::translation(tx, ty).multiply(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    /// `Tm`
    pub fn set_matrix(&mut self, m: Matrix) {
        self.text_matrix = m;
        self.line_matrix = m;
    }

    /// `T*` with the given leading.
    pub fn next_line(&mut self, leading: f64) {
        self.move_text_position(0.0, -leading);
    }

    /// Move the text matrix along the baseline by `tx` unscaled text
    /// space units (already multiplied by horizontal scaling).
    pub fn advance(&mut self, tx: f64) {
        self.text_matrix = Matrix::translation(tx, 0.0).multiply(&self.text_matrix);
    }
}
