//! Fixed categorical catalogs for simulated customers.
//!
//! Catalog sizes (industry 11, country 7, plan 3) are mutually coprime so
//! cycling `index mod size` never lines the attributes up into a short
//! repeating pattern.

use serde::{Deserialize, Serialize};

macro_rules! catalog {
    ($name:ident { $($variant:ident => $label:expr),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn display_name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }

            /// Deterministic pick by cycling through the catalog.
            pub fn cycled(index: usize) -> Self {
                Self::ALL[index % Self::ALL.len()]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.display_name())
            }
        }
    };
}

catalog!(Industry {
    Technology => "Technology",
    Finance => "Finance",
    Healthcare => "Healthcare",
    Manufacturing => "Manufacturing",
    Retail => "Retail",
    Energy => "Energy",
    Transportation => "Transportation",
    Telecom => "Telecom",
    Entertainment => "Entertainment",
    Education => "Education",
    SocialMedia => "Social Media",
});

catalog!(Country {
    UnitedStates => "United States",
    UnitedKingdom => "United Kingdom",
    Germany => "Germany",
    France => "France",
    Italy => "Italy",
    Greece => "Greece",
    Turkey => "Turkey",
});

catalog!(Plan {
    Basic => "Basic",
    Pro => "Pro",
    Enterprise => "Enterprise",
});

catalog!(Channel {
    Facebook => "Facebook",
    Instagram => "Instagram",
    Twitter => "Twitter",
    LinkedIn => "LinkedIn",
    YouTube => "YouTube",
});

catalog!(ChurnReason {
    ActivityDrop => "Post count drop",
});

impl Channel {
    /// Probability that a customer is active on this channel at all.
    pub fn popularity(&self) -> f64 {
        match self {
            Self::Facebook => 0.40,
            Self::Instagram => 0.30,
            Self::Twitter => 0.20,
            Self::LinkedIn => 0.05,
            Self::YouTube => 0.05,
        }
    }

    pub fn most_popular() -> Self {
        Self::Facebook
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_sizes_are_coprime() {
        fn gcd(a: usize, b: usize) -> usize {
            if b == 0 { a } else { gcd(b, a % b) }
        }
        let sizes = [Industry::ALL.len(), Country::ALL.len(), Plan::ALL.len()];
        for i in 0..sizes.len() {
            for j in (i + 1)..sizes.len() {
                assert_eq!(gcd(sizes[i], sizes[j]), 1, "{sizes:?} not coprime");
            }
        }
    }

    #[test]
    fn channel_popularities_sum_to_one() {
        let total: f64 = Channel::ALL.iter().map(|c| c.popularity()).sum();
        assert!((total - 1.0).abs() < 1e-12, "popularities sum to {total}");
    }

    #[test]
    fn most_popular_channel_is_consistent() {
        let best = Channel::ALL
            .iter()
            .copied()
            .max_by(|a, b| a.popularity().total_cmp(&b.popularity()))
            .unwrap();
        assert_eq!(best, Channel::most_popular());
    }
}
