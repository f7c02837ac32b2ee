use ndarray::{Array3, ArrayView2, Axis, ShapeBuilder};

use crate::error::{Error, Result};
use crate::utils::parser::RawTensor;

/// 逻辑坐标轴
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridAxis {
    X,
    Y,
    Z,
}

impl GridAxis {
    pub const ALL: [GridAxis; 3] = [GridAxis::X, GridAxis::Y, GridAxis::Z];

    pub fn index(self) -> usize {
        match self {
            GridAxis::X => 0,
            GridAxis::Y => 1,
            GridAxis::Z => 2,
        }
    }
}

/// 三维密度场
/// 逻辑坐标轴为 (X, Y, Z)，由磁盘上的数组经过坐标轴置换得到；加载后只读
#[derive(Debug, Clone)]
pub struct DensityField {
    data: Array3<f64>,
}

impl DensityField {
    pub fn new(data: Array3<f64>) -> Self {
        DensityField { data }
    }

    /// 由磁盘数组创建密度场
    ///
    /// `raw` 按 MATLAB 列优先顺序存放。逻辑轴 `a` 取自磁盘轴
    /// `axis_order[a]`，默认的 `[1, 0, 2]` 交换前两个维度，
    /// 即 `logical[j, i, k] == on_disk[i, j, k]`。
    pub fn from_raw(raw: RawTensor, axis_order: [usize; 3]) -> Result<Self> {
        let mut sorted = axis_order;
        sorted.sort_unstable();
        if sorted != [0, 1, 2] {
            return Err(Error::InvalidConfig(format!(
                "axis_order {:?} 不是 [0, 1, 2] 的排列",
                axis_order
            )));
        }

        let dims = to_3d(&raw.dims)?;
        let total_elements = dims[0] * dims[1] * dims[2];
        if raw.data.len() != total_elements {
            return Err(Error::Mat(format!(
                "数据量不匹配: shape {:?} 需要 {} 个元素，但提供了 {} 个",
                dims,
                total_elements,
                raw.data.len()
            )));
        }

        let on_disk = Array3::from_shape_vec((dims[0], dims[1], dims[2]).f(), raw.data)
            .map_err(|e| Error::Mat(e.to_string()))?;
        Ok(DensityField {
            data: on_disk.permuted_axes(axis_order),
        })
    }

    pub fn shape(&self) -> [usize; 3] {
        let dim = self.data.dim();
        [dim.0, dim.1, dim.2]
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<f64> {
        self.data.get((x, y, z)).copied()
    }

    /// 垂直于 `axis` 的二维切片，其余两轴保持原有顺序
    pub fn slice(&self, axis: GridAxis, index: usize) -> ArrayView2<'_, f64> {
        self.data.index_axis(Axis(axis.index()), index)
    }

    /// 检查形状是否等于配置的网格形状
    pub fn check_shape(&self, expected: [usize; 3]) -> Result<()> {
        let actual = self.shape();
        if actual != expected {
            return Err(Error::ShapeMismatch {
                expected,
                actual: actual.to_vec(),
            });
        }
        Ok(())
    }

    /// 全局最小值和最大值，忽略 NaN 和无穷大
    pub fn value_range(&self) -> Result<(f64, f64)> {
        let (min, max) = self
            .data
            .iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if min > max {
            return Err(Error::NoFiniteValues);
        }
        Ok((min, max))
    }
}

/// MATLAB 会省略末尾的单元素维度，这里补齐或裁剪到三维
fn to_3d(dims: &[usize]) -> Result<[usize; 3]> {
    match dims.len() {
        0 => Ok([1, 1, 1]),
        1 => Ok([dims[0], 1, 1]),
        2 => Ok([dims[0], dims[1], 1]),
        _ if dims[3..].iter().all(|&d| d == 1) => Ok([dims[0], dims[1], dims[2]]),
        _ => Err(Error::Mat(format!("需要三维数组，实际维度 {:?}", dims))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_major(dims: [usize; 3], f: impl Fn(usize, usize, usize) -> f64) -> RawTensor {
        let mut data = Vec::with_capacity(dims.iter().product());
        for k in 0..dims[2] {
            for j in 0..dims[1] {
                for i in 0..dims[0] {
                    data.push(f(i, j, k));
                }
            }
        }
        RawTensor {
            dims: dims.to_vec(),
            data,
        }
    }

    #[test]
    fn test_permutation_swaps_first_two_axes() {
        let encode = |i: usize, j: usize, k: usize| (i * 10000 + j * 100 + k) as f64;
        let raw = column_major([3, 5, 2], encode);
        let field = DensityField::from_raw(raw, [1, 0, 2]).unwrap();

        assert_eq!(field.shape(), [5, 3, 2]);
        for i in 0..3 {
            for j in 0..5 {
                for k in 0..2 {
                    assert_eq!(field.get(j, i, k), Some(encode(i, j, k)));
                }
            }
        }
    }

    #[test]
    fn test_identity_order_keeps_layout() {
        let raw = column_major([2, 3, 4], |i, j, k| (i + 2 * j + 6 * k) as f64);
        let field = DensityField::from_raw(raw, [0, 1, 2]).unwrap();
        assert_eq!(field.shape(), [2, 3, 4]);
        assert_eq!(field.get(1, 2, 3), Some((1 + 4 + 18) as f64));
    }

    #[test]
    fn test_trailing_singleton_dims() {
        let raw = RawTensor {
            dims: vec![2, 3],
            data: vec![0.0; 6],
        };
        let field = DensityField::from_raw(raw, [1, 0, 2]).unwrap();
        assert_eq!(field.shape(), [3, 2, 1]);

        let raw = RawTensor {
            dims: vec![2, 2, 2, 2],
            data: vec![0.0; 16],
        };
        assert!(DensityField::from_raw(raw, [1, 0, 2]).is_err());
    }

    #[test]
    fn test_length_mismatch() {
        let raw = RawTensor {
            dims: vec![2, 2, 2],
            data: vec![0.0; 7],
        };
        assert!(matches!(
            DensityField::from_raw(raw, [1, 0, 2]),
            Err(Error::Mat(_))
        ));
    }

    #[test]
    fn test_value_range_ignores_nan() {
        let raw = column_major([2, 2, 2], |i, j, k| {
            if i == 0 && j == 0 && k == 0 {
                f64::NAN
            } else {
                (i + j + k) as f64
            }
        });
        let field = DensityField::from_raw(raw, [1, 0, 2]).unwrap();
        assert_eq!(field.value_range().unwrap(), (1.0, 3.0));

        let all_nan = DensityField::new(Array3::from_elem((2, 2, 2), f64::NAN));
        assert!(matches!(all_nan.value_range(), Err(Error::NoFiniteValues)));
    }

    #[test]
    fn test_shape_check_and_slices() {
        let field = DensityField::new(Array3::from_shape_fn((4, 3, 2), |(x, y, z)| {
            (x * 100 + y * 10 + z) as f64
        }));
        assert!(field.check_shape([4, 3, 2]).is_ok());
        assert!(matches!(
            field.check_shape([2048, 256, 256]),
            Err(Error::ShapeMismatch { .. })
        ));

        let top = field.slice(GridAxis::Z, 1);
        assert_eq!(top.dim(), (4, 3));
        assert_eq!(top[[3, 2]], 321.0);

        let front = field.slice(GridAxis::Y, 0);
        assert_eq!(front.dim(), (4, 2));
        assert_eq!(front[[2, 1]], 201.0);
    }
}
