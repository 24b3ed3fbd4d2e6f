//! Grid geometry mapping mosaic cells to canvas regions
//!
//! Cell dimensions come from integer division of the canvas by the requested
//! column and row counts. The division remainder is absorbed by the last column
//! and the last row, so interior cells all share the same size and the grid
//! always covers the full canvas.

use crate::io::error::{Result, invalid_parameter};

/// Axis-aligned pixel rectangle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Left edge (inclusive)
    pub x: u32,
    /// Top edge (inclusive)
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Rect {
    /// Create a rectangle from origin and size
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Width divided by height
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height.max(1))
    }
}

/// Column/row layout of a mosaic over a canvas of known size
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridGeometry {
    columns: u32,
    rows: u32,
    cell_width: u32,
    cell_height: u32,
    width: u32,
    height: u32,
}

impl GridGeometry {
    /// Lay out `columns × rows` cells over a `width × height` canvas
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `columns` or `rows` is zero
    /// - The canvas is narrower than `columns` or shorter than `rows` pixels
    pub fn new(width: u32, height: u32, columns: u32, rows: u32) -> Result<Self> {
        if columns == 0 {
            return Err(invalid_parameter(
                "columns",
                &columns,
                &"must be greater than zero",
            ));
        }
        if rows == 0 {
            return Err(invalid_parameter("rows", &rows, &"must be greater than zero"));
        }
        if width < columns {
            return Err(invalid_parameter(
                "columns",
                &columns,
                &format!("exceeds canvas width of {width} pixels"),
            ));
        }
        if height < rows {
            return Err(invalid_parameter(
                "rows",
                &rows,
                &format!("exceeds canvas height of {height} pixels"),
            ));
        }

        Ok(Self {
            columns,
            rows,
            cell_width: width / columns,
            cell_height: height / rows,
            width,
            height,
        })
    }

    /// Number of grid columns
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of grid rows
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Width of an interior cell
    pub const fn cell_width(&self) -> u32 {
        self.cell_width
    }

    /// Height of an interior cell
    pub const fn cell_height(&self) -> u32 {
        self.cell_height
    }

    /// Canvas width in pixels
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Canvas height in pixels
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells
    pub const fn cell_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Aspect ratio (width / height) every tile is cropped to
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.cell_width) / f64::from(self.cell_height)
    }

    /// Canvas region covered by cell (`col`, `row`)
    ///
    /// The last column and last row extend to the canvas edge.
    pub const fn cell_rect(&self, col: u32, row: u32) -> Rect {
        let x = col * self.cell_width;
        let y = row * self.cell_height;
        let width = if col + 1 >= self.columns {
            self.width - x
        } else {
            self.cell_width
        };
        let height = if row + 1 >= self.rows {
            self.height - y
        } else {
            self.cell_height
        };
        Rect::new(x, y, width, height)
    }

    /// (column, row) of the cell at a row-major index
    pub const fn cell_position(&self, index: usize) -> (u32, u32) {
        let columns = self.columns as usize;
        ((index % columns) as u32, (index / columns) as u32)
    }

    /// Iterate all cells as (column, row) in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> + use<> {
        let columns = self.columns;
        (0..self.rows).flat_map(move |row| (0..columns).map(move |col| (col, row)))
    }
}
