use rand::Rng;
use std::fmt;

const PREFIX: &str = "job_";
const SUFFIX_LEN: usize = 12;
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// An opaque job identifier: `job_` followed by 12 URL-safe characters.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobId(String);

#[derive(Debug, thiserror::Error)]
#[error("invalid job id {0:?}: expected \"job_\" followed by {SUFFIX_LEN} URL-safe characters")]
pub struct InvalidJobId(String);

impl JobId {
    /// Generates a fresh, random job ID.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Self(format!("{PREFIX}{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl std::str::FromStr for JobId {
    type Err = InvalidJobId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.strip_prefix(PREFIX).is_some_and(|suffix| {
            suffix.len() == SUFFIX_LEN && suffix.bytes().all(|b| ALPHABET.contains(&b))
        });
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidJobId(s.to_string()))
        }
    }
}

impl TryFrom<String> for JobId {
    type Error = InvalidJobId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<JobId> for String {
    fn from(value: JobId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn generated_ids_round_trip() {
        let id = JobId::generate();
        assert!(id.as_str().starts_with(PREFIX));
        assert_eq!(id.as_str().len(), PREFIX.len() + SUFFIX_LEN);

        let parsed: JobId = id.as_str().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!("job_short".parse::<JobId>().is_err());
        assert!("notjob_aaaaaaaaaaaa".parse::<JobId>().is_err());
        assert!("job_!!!!!!!!!!!!".parse::<JobId>().is_err());
    }
}
