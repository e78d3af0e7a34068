use crate::result::ProbeKind;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MARKER_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MARKER_TOKEN_LEN: usize = 8;

/// Source of inert, unique marker strings for reflection probes.
///
/// Every call must hand out a fresh value; the prober never reuses one.
pub trait MarkerSource: Send {
    fn next_marker(&mut self, kind: ProbeKind) -> String;
}

/// `PREFIX_XXXXXXXX` markers drawn from an injected random source
#[derive(Debug, Clone)]
pub struct RandomMarkers<R = StdRng> {
    rng: R,
}

impl RandomMarkers<StdRng> {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Reproducible markers for tests
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for RandomMarkers<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> RandomMarkers<R> {
    pub fn from_rng(rng: R) -> Self {
        Self { rng }
    }

    fn token(&mut self) -> String {
        (0..MARKER_TOKEN_LEN)
            .map(|_| MARKER_CHARSET[self.rng.random_range(0..MARKER_CHARSET.len())] as char)
            .collect()
    }
}

impl<R: Rng + Send> MarkerSource for RandomMarkers<R> {
    fn next_marker(&mut self, kind: ProbeKind) -> String {
        format!("{}_{}", kind.marker_prefix(), self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_marker_shape() {
        let mut markers = RandomMarkers::seeded(1);
        let marker = markers.next_marker(ProbeKind::FormReflection);
        let (prefix, token) = marker.split_once('_').unwrap();
        assert_eq!(prefix, "REFLF");
        assert_eq!(token.len(), MARKER_TOKEN_LEN);
        assert!(token.bytes().all(|b| MARKER_CHARSET.contains(&b)));

        let query = markers.next_marker(ProbeKind::ParamReflection);
        assert!(query.starts_with("REFLQ_"));
    }

    #[test]
    fn test_markers_do_not_repeat() {
        let mut markers = RandomMarkers::new();
        let drawn: HashSet<String> = (0..500)
            .map(|_| markers.next_marker(ProbeKind::FormReflection))
            .collect();
        assert_eq!(drawn.len(), 500);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = RandomMarkers::seeded(42);
        let mut b = RandomMarkers::seeded(42);
        for _ in 0..5 {
            assert_eq!(
                a.next_marker(ProbeKind::ParamReflection),
                b.next_marker(ProbeKind::ParamReflection)
            );
        }
    }
}
