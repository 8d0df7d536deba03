//! Test particles and their first-order variational partners.
//!
//! The particle array keeps the ordering `[real_0..real_{n-1},
//! var_0..var_{m-1}]`; each variational particle is bound to exactly one
//! real parent through a `VariationalLink`, so a link's index always
//! exceeds its parent's. Force terms walk the links of the particle they
//! just acted on and apply their Jacobian to the partner's state.

use crate::error::{Error, Result};
use ephem_core::Vector3;

/// One particle: position (AU), velocity (AU/day), and the acceleration
/// scratch the force terms accumulate into (AU/day^2). For a variational
/// partner the components are differentials along the parent's trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Particle {
    pub pos: Vector3,
    pub vel: Vector3,
    pub acc: Vector3,
}

impl Particle {
    pub fn from_state(state: &[f64]) -> Self {
        Self {
            pos: Vector3::new(state[0], state[1], state[2]),
            vel: Vector3::new(state[3], state[4], state[5]),
            acc: Vector3::zeros(),
        }
    }
}

/// Binding of a variational particle to its real parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariationalLink {
    pub parent: usize,
    pub index: usize,
}

/// The full particle array plus its variational links.
#[derive(Debug, Clone)]
pub struct ParticleSet {
    particles: Vec<Particle>,
    n_real: usize,
    links: Vec<VariationalLink>,
}

impl ParticleSet {
    /// Builds the set from flat 6-tuples: `real` holds the test particles,
    /// `var` the variational partners, `parents[i]` the real index the i-th
    /// partner differentiates.
    pub fn from_states(real: &[f64], parents: &[usize], var: &[f64]) -> Result<Self> {
        if real.len() % 6 != 0 {
            return Err(Error::InvalidConfiguration(format!(
                "real state length {} is not a multiple of 6",
                real.len()
            )));
        }
        if var.len() % 6 != 0 {
            return Err(Error::InvalidConfiguration(format!(
                "variational state length {} is not a multiple of 6",
                var.len()
            )));
        }
        let n_real = real.len() / 6;
        let n_var = var.len() / 6;
        if parents.len() != n_var {
            return Err(Error::InvalidConfiguration(format!(
                "{} variational states but {} parent indices",
                n_var,
                parents.len()
            )));
        }
        if n_real == 0 {
            return Err(Error::InvalidConfiguration("no test particles".into()));
        }

        let mut particles = Vec::with_capacity(n_real + n_var);
        for chunk in real.chunks_exact(6) {
            particles.push(Particle::from_state(chunk));
        }
        let mut links = Vec::with_capacity(n_var);
        for (i, (&parent, chunk)) in parents.iter().zip(var.chunks_exact(6)).enumerate() {
            if parent >= n_real {
                return Err(Error::InvalidConfiguration(format!(
                    "variational particle {} references parent {} of {} real particles",
                    i, parent, n_real
                )));
            }
            links.push(VariationalLink {
                parent,
                index: n_real + i,
            });
            particles.push(Particle::from_state(chunk));
        }

        Ok(Self {
            particles,
            n_real,
            links,
        })
    }

    pub fn n_real(&self) -> usize {
        self.n_real
    }

    pub fn n_total(&self) -> usize {
        self.particles.len()
    }

    pub fn particle(&self, index: usize) -> &Particle {
        &self.particles[index]
    }

    pub fn particle_mut(&mut self, index: usize) -> &mut Particle {
        &mut self.particles[index]
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Link by position; links are cheap copies so callers can hold one
    /// while mutating particles.
    pub fn link(&self, index: usize) -> VariationalLink {
        self.links[index]
    }

    /// Links bound to the given real particle.
    pub fn links_for(&self, parent: usize) -> impl Iterator<Item = VariationalLink> + '_ {
        self.links
            .iter()
            .copied()
            .filter(move |l| l.parent == parent)
    }

    pub fn zero_accelerations(&mut self) {
        for p in &mut self.particles {
            p.acc = Vector3::zeros();
        }
    }
}
