//! Mass, center-of-gravity and inertia roll-up.

/// Lumped mass properties of a part or sub-assembly.
///
/// `inertia` holds the diagonal moments (Ixx, Iyy, Izz) about the part's own
/// center of gravity, in body axes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MassProperties {
    pub mass: f64,
    pub cg: [f64; 3],
    pub inertia: [f64; 3],
}

impl MassProperties {
    pub fn point(mass: f64, cg: [f64; 3]) -> Self {
        Self {
            mass,
            cg,
            inertia: [0.0; 3],
        }
    }

    /// Combine several bodies, transferring inertias to the common CG with the
    /// parallel-axis theorem.
    pub fn combine<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a MassProperties> + Clone,
    {
        let mass: f64 = items.clone().into_iter().map(|p| p.mass).sum();
        if mass <= 0.0 {
            return MassProperties::default();
        }

        let mut cg = [0.0; 3];
        for p in items.clone() {
            for (axis, c) in cg.iter_mut().enumerate() {
                *c += p.mass * p.cg[axis];
            }
        }
        for c in cg.iter_mut() {
            *c /= mass;
        }

        let mut inertia = [0.0; 3];
        for p in items {
            let d = [p.cg[0] - cg[0], p.cg[1] - cg[1], p.cg[2] - cg[2]];
            inertia[0] += p.inertia[0] + p.mass * (d[1] * d[1] + d[2] * d[2]);
            inertia[1] += p.inertia[1] + p.mass * (d[0] * d[0] + d[2] * d[2]);
            inertia[2] += p.inertia[2] + p.mass * (d[0] * d[0] + d[1] * d[1]);
        }

        Self { mass, cg, inertia }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn two_point_masses() {
        let a = MassProperties::point(1.0, [-1.0, 0.0, 0.0]);
        let b = MassProperties::point(1.0, [1.0, 0.0, 0.0]);
        let total = MassProperties::combine([&a, &b]);

        assert_relative_eq!(total.mass, 2.0);
        assert_relative_eq!(total.cg[0], 0.0);
        // Each mass sits 1 m from the CG along x
        assert_relative_eq!(total.inertia[0], 0.0);
        assert_relative_eq!(total.inertia[1], 2.0);
        assert_relative_eq!(total.inertia[2], 2.0);
    }

    #[test]
    fn massless_set_is_default() {
        let total = MassProperties::combine(&[] as &[MassProperties]);
        assert_eq!(total, MassProperties::default());
    }
}
