use crate::group::GroupSizeBounds;
use crate::moduli::ModuliSource;
use crate::Error;

/// Group exchange configuration
#[derive(Debug, Clone)]
pub struct Config {
    group_size_bounds: GroupSizeBounds,
    moduli: ModuliSource,
    fallback_group: bool,
    strict_reply_state: bool,
    rng_seed: Option<u64>,
}

impl Config {
    /// Create a new configuration builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            group_size_bounds: GroupSizeBounds::default(),
            moduli: ModuliSource::default(),
            fallback_group: true,
            strict_reply_state: false,
            rng_seed: None,
        }
    }

    /// Group sizes a client asks for, and the window a server clamps
    /// requests into.
    #[inline(always)]
    pub fn group_size_bounds(&self) -> GroupSizeBounds {
        self.group_size_bounds
    }

    /// Where a server reads candidate groups from.
    #[inline(always)]
    pub fn moduli(&self) -> &ModuliSource {
        &self.moduli
    }

    /// For a server, use the built-in 2048 bit group when the moduli
    /// database has no fitting entry or cannot be opened.
    #[inline(always)]
    pub fn fallback_group(&self) -> bool {
        self.fallback_group
    }

    /// For a client, only accept `SSH_MSG_KEX_DH_GEX_REPLY` after our
    /// `SSH_MSG_KEX_DH_GEX_INIT` was sent.
    #[inline(always)]
    pub fn strict_reply_state(&self) -> bool {
        self.strict_reply_state
    }

    /// Seed for the random generator.
    #[inline(always)]
    pub fn rng_seed(&self) -> Option<u64> {
        self.rng_seed
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    group_size_bounds: GroupSizeBounds,
    moduli: ModuliSource,
    fallback_group: bool,
    strict_reply_state: bool,
    rng_seed: Option<u64>,
}

impl ConfigBuilder {
    /// Set the `(min, preferred, max)` group sizes a client requests.
    ///
    /// A server only offers groups with `min <= bits <= max`.
    ///
    /// Defaults to `(2048, 2048, 8192)`.
    pub fn group_size_bounds(mut self, bounds: GroupSizeBounds) -> Self {
        self.group_size_bounds = bounds;
        self
    }

    /// Set the moduli database.
    ///
    /// Defaults to `/etc/ssh/moduli`.
    pub fn moduli(mut self, moduli: ModuliSource) -> Self {
        self.moduli = moduli;
        self
    }

    /// Set whether a server falls back to the built-in group.
    ///
    /// Defaults to true.
    pub fn fallback_group(mut self, enabled: bool) -> Self {
        self.fallback_group = enabled;
        self
    }

    /// Set whether the client rejects a reply received before its init was
    /// sent. Peers that follow the protocol never notice the difference.
    ///
    /// Defaults to false.
    pub fn strict_reply_state(mut self, strict: bool) -> Self {
        self.strict_reply_state = strict;
        self
    }

    /// Seed the random generator. Only meant for tests.
    pub fn rng_seed(mut self, seed: Option<u64>) -> Self {
        self.rng_seed = seed;
        self
    }

    /// Build the configuration.
    ///
    /// Returns `Error::Config` if the group size bounds are not ordered
    /// `min <= preferred <= max`.
    pub fn build(self) -> Result<Config, Error> {
        let b = self.group_size_bounds;
        if !b.is_ordered() {
            return Err(Error::Config(format!(
                "group size bounds must satisfy min <= preferred <= max, got [{}:{}:{}]",
                b.min, b.preferred, b.max
            )));
        }

        Ok(Config {
            group_size_bounds: self.group_size_bounds,
            moduli: self.moduli,
            fallback_group: self.fallback_group,
            strict_reply_state: self.strict_reply_state,
            rng_seed: self.rng_seed,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::builder()
            .build()
            .expect("Default config should always validate")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.group_size_bounds(), GroupSizeBounds::new(2048, 2048, 8192));
        assert!(config.fallback_group());
        assert!(!config.strict_reply_state());
        assert!(matches!(config.moduli(), ModuliSource::File(_)));
    }

    #[test]
    fn unordered_bounds_are_rejected() {
        let res = Config::builder()
            .group_size_bounds(GroupSizeBounds::new(4096, 2048, 8192))
            .build();
        assert!(matches!(res, Err(Error::Config(_))));
    }
}
