use nalgebra::{Scalar, Vector3};

/// Component-wise minimum and maximum of two values. Used for growing bounding boxes
pub trait MinMax {
    /// Computes the infimum of this value and `other`. For scalar types this is the minimum of the two
    /// values, for vector types it is the component-wise minimum. A NaN operand is ignored in favor of the
    /// other operand
    ///
    /// # Example
    /// ```
    /// use tessera_core::math::MinMax;
    /// # use tessera_core::nalgebra::Vector3;
    ///
    /// assert_eq!(5.0_f64.infimum(&3.0), 3.0);
    /// assert_eq!(f64::NAN.infimum(&1.0), 1.0);
    /// assert_eq!(Vector3::new(1.0, 2.0, 3.0).infimum(&Vector3::new(2.0, 1.0, 0.0)), Vector3::new(1.0, 1.0, 0.0));
    /// ```
    fn infimum(&self, other: &Self) -> Self;
    /// Computes the supremum of this value and `other`, the counterpart of [`MinMax::infimum`]
    ///
    /// # Example
    /// ```
    /// use tessera_core::math::MinMax;
    /// # use tessera_core::nalgebra::Vector3;
    ///
    /// assert_eq!(5.0_f64.supremum(&3.0), 5.0);
    /// assert_eq!(Vector3::new(1.0, 2.0, 3.0).supremum(&Vector3::new(2.0, 1.0, 4.0)), Vector3::new(2.0, 2.0, 4.0));
    /// ```
    fn supremum(&self, other: &Self) -> Self;
}

impl MinMax for f64 {
    fn infimum(&self, other: &Self) -> Self {
        self.min(*other)
    }

    fn supremum(&self, other: &Self) -> Self {
        self.max(*other)
    }
}

impl<T: MinMax + Scalar> MinMax for Vector3<T> {
    fn infimum(&self, other: &Self) -> Self {
        Vector3::new(
            self.x.infimum(&other.x),
            self.y.infimum(&other.y),
            self.z.infimum(&other.z),
        )
    }

    fn supremum(&self, other: &Self) -> Self {
        Vector3::new(
            self.x.supremum(&other.x),
            self.y.supremum(&other.y),
            self.z.supremum(&other.z),
        )
    }
}
