// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Leadfield layout and the two-hemisphere source space it indexes.

use nalgebra::{DMatrix, DMatrixView};
use serde::{Deserialize, Serialize};

use crate::whitening::Whitener;
use crate::{MusicError, MusicResult};

/// Dipole orientation model of a leadfield.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOrientation {
    /// One column per location (fixed or surface-normal dipoles).
    Fixed,
    /// Three columns per location (x, y, z dipole components).
    Free,
}

impl SourceOrientation {
    /// Columns per candidate block.
    pub const fn width(self) -> usize {
        match self {
            SourceOrientation::Fixed => 1,
            SourceOrientation::Free => 3,
        }
    }
}

/// Channels × (candidates · width) gain matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct Leadfield {
    matrix: DMatrix<f64>,
    orientation: SourceOrientation,
}

impl Leadfield {
    pub fn new(matrix: DMatrix<f64>, orientation: SourceOrientation) -> MusicResult<Self> {
        let width = orientation.width();
        if matrix.nrows() == 0 || matrix.ncols() == 0 {
            return Err(MusicError::EmptyInput("leadfield"));
        }
        if matrix.ncols() % width != 0 {
            return Err(MusicError::RaggedLeadfield {
                columns: matrix.ncols(),
                width,
            });
        }
        Ok(Self {
            matrix,
            orientation,
        })
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn orientation(&self) -> SourceOrientation {
        self.orientation
    }

    pub fn n_channels(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn n_candidates(&self) -> usize {
        self.matrix.ncols() / self.orientation.width()
    }

    /// Columns belonging to candidate `index`.
    ///
    /// # Panics
    /// When `index >= n_candidates()`.
    pub fn block(&self, index: usize) -> DMatrixView<'_, f64> {
        let width = self.orientation.width();
        self.matrix.columns(index * width, width)
    }

    /// Left-multiplies the gain by the whitening operator.
    pub fn whiten(&self, whitener: &Whitener) -> MusicResult<Self> {
        Ok(Self {
            matrix: whitener.apply(&self.matrix)?,
            orientation: self.orientation,
        })
    }

    /// `P · G` with the same block layout.
    pub(crate) fn projected(&self, projector: &DMatrix<f64>) -> Self {
        Self {
            matrix: projector * &self.matrix,
            orientation: self.orientation,
        }
    }

    /// Keeps only the surface-normal component (`z`, the third column of each
    /// free block), yielding a fixed-orientation leadfield.
    pub fn pick_normal(&self) -> MusicResult<Self> {
        if self.orientation != SourceOrientation::Free {
            return Err(MusicError::NormalPickOnFixedOrientation);
        }
        let candidates = self.n_candidates();
        let matrix = DMatrix::from_fn(self.n_channels(), candidates, |r, c| {
            self.matrix[(r, 3 * c + 2)]
        });
        Leadfield::new(matrix, SourceOrientation::Fixed)
    }
}

/// Which hemisphere a vertex lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hemisphere {
    Left,
    Right,
}

/// Vertex identifiers of the left then right hemisphere, in leadfield order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpaceVertices {
    pub lh: Vec<u32>,
    pub rh: Vec<u32>,
}

impl SourceSpaceVertices {
    pub fn new(lh: Vec<u32>, rh: Vec<u32>) -> Self {
        Self { lh, rh }
    }

    pub fn len(&self) -> usize {
        self.lh.len() + self.rh.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lh.is_empty() && self.rh.is_empty()
    }

    /// Translates a flat candidate index into `(hemisphere, vertex id)`.
    pub fn locate(&self, candidate: usize) -> Option<(Hemisphere, u32)> {
        if candidate < self.lh.len() {
            Some((Hemisphere::Left, self.lh[candidate]))
        } else {
            self.rh
                .get(candidate - self.lh.len())
                .map(|&vertex| (Hemisphere::Right, vertex))
        }
    }

    /// Restricts the source space to `candidates`, which must be sorted.
    pub fn select(&self, candidates: &[usize]) -> Self {
        let mut lh = Vec::new();
        let mut rh = Vec::new();
        for &candidate in candidates {
            match self.locate(candidate) {
                Some((Hemisphere::Left, vertex)) => lh.push(vertex),
                Some((Hemisphere::Right, vertex)) => rh.push(vertex),
                None => {}
            }
        }
        Self { lh, rh }
    }
}

/// Leadfield plus the source space it was computed on.
#[derive(Clone, Debug, PartialEq)]
pub struct ForwardOperator {
    leadfield: Leadfield,
    vertices: SourceSpaceVertices,
    subject: Option<String>,
}

impl ForwardOperator {
    pub fn new(
        leadfield: Leadfield,
        vertices: SourceSpaceVertices,
        subject: Option<String>,
    ) -> MusicResult<Self> {
        if leadfield.n_candidates() != vertices.len() {
            return Err(MusicError::VertexCountMismatch {
                candidates: leadfield.n_candidates(),
                vertices: vertices.len(),
            });
        }
        Ok(Self {
            leadfield,
            vertices,
            subject,
        })
    }

    pub fn leadfield(&self) -> &Leadfield {
        &self.leadfield
    }

    pub fn vertices(&self) -> &SourceSpaceVertices {
        &self.vertices
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Same source space with only the surface-normal leadfield columns.
    pub fn with_normal_orientation(&self) -> MusicResult<Self> {
        Ok(Self {
            leadfield: self.leadfield.pick_normal()?,
            vertices: self.vertices.clone(),
            subject: self.subject.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_leadfield() -> Leadfield {
        // 2 channels, 2 free locations
        let matrix = DMatrix::from_row_slice(
            2,
            6,
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0],
        );
        Leadfield::new(matrix, SourceOrientation::Free).unwrap()
    }

    #[test]
    fn blocks_are_contiguous_columns() {
        let lf = free_leadfield();
        assert_eq!(lf.n_candidates(), 2);
        let block = lf.block(1);
        assert_eq!(block.shape(), (2, 3));
        assert_eq!(block[(0, 0)], 4.0);
        assert_eq!(block[(1, 2)], 12.0);
    }

    #[test]
    fn ragged_leadfield_is_rejected() {
        let err = Leadfield::new(DMatrix::zeros(2, 4), SourceOrientation::Free).unwrap_err();
        assert!(matches!(
            err,
            MusicError::RaggedLeadfield {
                columns: 4,
                width: 3
            }
        ));
    }

    #[test]
    fn normal_pick_keeps_every_third_column() {
        let normal = free_leadfield().pick_normal().unwrap();
        assert_eq!(normal.orientation(), SourceOrientation::Fixed);
        assert_eq!(normal.matrix(), &DMatrix::from_row_slice(2, 2, &[3.0, 6.0, 9.0, 12.0]));
        assert!(matches!(
            normal.pick_normal(),
            Err(MusicError::NormalPickOnFixedOrientation)
        ));
    }

    #[test]
    fn candidates_map_onto_hemispheres() {
        let vertices = SourceSpaceVertices::new(vec![10, 20, 30], vec![5, 15]);
        assert_eq!(vertices.locate(0), Some((Hemisphere::Left, 10)));
        assert_eq!(vertices.locate(2), Some((Hemisphere::Left, 30)));
        assert_eq!(vertices.locate(3), Some((Hemisphere::Right, 5)));
        assert_eq!(vertices.locate(4), Some((Hemisphere::Right, 15)));
        assert_eq!(vertices.locate(5), None);

        let picked = vertices.select(&[1, 2, 4]);
        assert_eq!(picked.lh, vec![20, 30]);
        assert_eq!(picked.rh, vec![15]);
    }

    #[test]
    fn forward_requires_matching_vertex_count() {
        let err = ForwardOperator::new(
            free_leadfield(),
            SourceSpaceVertices::new(vec![1], vec![]),
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MusicError::VertexCountMismatch {
                candidates: 2,
                vertices: 1
            }
        ));
    }
}
