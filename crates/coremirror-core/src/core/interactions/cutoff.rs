use super::error::DefinitionError;

/// Hard cutoff plus the smoothing margin below it.
///
/// Always satisfies `0 <= margin <= cutoff`, so the soft cutoff
/// `cutoff - margin` lies in `[0, cutoff]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CutoffWindow {
    cutoff: f64,
    margin: f64,
}

impl CutoffWindow {
    pub fn new(cutoff: f64, margin: f64) -> Result<Self, DefinitionError> {
        let mut window = Self::default();
        window.set_cutoff(cutoff)?;
        window.set_margin(margin)?;
        Ok(window)
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    pub fn soft_cutoff(&self) -> f64 {
        self.cutoff - self.margin
    }

    pub fn set_cutoff(&mut self, cutoff: f64) -> Result<(), DefinitionError> {
        if !cutoff.is_finite() || cutoff < 0.0 {
            return Err(DefinitionError::InvalidCutoff { cutoff });
        }
        if self.margin > cutoff {
            return Err(DefinitionError::CutoffMarginExceedsCutoff {
                margin: self.margin,
                cutoff,
            });
        }
        self.cutoff = cutoff;
        Ok(())
    }

    pub fn set_margin(&mut self, margin: f64) -> Result<(), DefinitionError> {
        if !margin.is_finite() || margin < 0.0 {
            return Err(DefinitionError::InvalidCutoffMargin { margin });
        }
        if margin > self.cutoff {
            return Err(DefinitionError::CutoffMarginExceedsCutoff {
                margin,
                cutoff: self.cutoff,
            });
        }
        self.margin = margin;
        Ok(())
    }

    /// Sets the margin so that the smoothing starts at `soft_cutoff`.
    pub fn set_soft_cutoff(&mut self, soft_cutoff: f64) -> Result<(), DefinitionError> {
        self.set_margin(self.cutoff - soft_cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn margin_must_stay_between_zero_and_cutoff() {
        let mut window = CutoffWindow::new(4.0, 0.0).unwrap();
        assert!(matches!(
            window.set_margin(-0.1),
            Err(DefinitionError::InvalidCutoffMargin { .. })
        ));
        assert!(matches!(
            window.set_margin(4.5),
            Err(DefinitionError::CutoffMarginExceedsCutoff { .. })
        ));
        window.set_margin(4.0).unwrap();
        assert_eq!(window.soft_cutoff(), 0.0);
    }

    #[test]
    fn soft_cutoff_is_translated_into_a_margin() {
        let mut window = CutoffWindow::new(4.0, 0.0).unwrap();
        window.set_soft_cutoff(3.5).unwrap();
        assert_eq!(window.margin(), 0.5);
        assert!(window.set_soft_cutoff(4.5).is_err());
        assert!(window.set_soft_cutoff(-1.0).is_err());
        assert_eq!(window.margin(), 0.5);
    }

    #[test]
    fn shrinking_the_cutoff_below_the_margin_is_rejected() {
        let mut window = CutoffWindow::new(4.0, 1.0).unwrap();
        assert!(window.set_cutoff(0.5).is_err());
        assert_eq!(window.cutoff(), 4.0);
        assert!(window.set_cutoff(-2.0).is_err());
    }

    #[test]
    fn infinite_and_nan_values_are_rejected() {
        assert!(matches!(
            CutoffWindow::new(f64::INFINITY, f64::INFINITY),
            Err(DefinitionError::InvalidCutoff { .. })
        ));
        assert!(matches!(
            CutoffWindow::new(f64::NAN, 0.0),
            Err(DefinitionError::InvalidCutoff { .. })
        ));

        let mut window = CutoffWindow::new(4.0, 1.0).unwrap();
        assert!(matches!(
            window.set_margin(f64::INFINITY),
            Err(DefinitionError::InvalidCutoffMargin { .. })
        ));
        assert!(window.set_soft_cutoff(f64::NEG_INFINITY).is_err());
        assert!(window.set_cutoff(f64::INFINITY).is_err());
        assert_eq!(window.cutoff(), 4.0);
        assert_eq!(window.soft_cutoff(), 3.0);
    }
}
