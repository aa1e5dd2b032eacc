//! Opaque parameter checkpoints.
//!
//! Any serializable component becomes a bincode blob; the agent stores one
//! blob file per network.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub fn save<T: Serialize>(component: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(component)?)
}

pub fn load<T: DeserializeOwned>(blob: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(blob)?)
}

pub fn save_to_file<T: Serialize, P: AsRef<Path>>(component: &T, path: P) -> Result<()> {
    std::fs::write(path, save(component)?)?;
    Ok(())
}

pub fn load_from_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let data = std::fs::read(path)?;
    load(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SacError;
    use crate::network::ValueNetwork;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_blob_restores_network() {
        let mut rng = StdRng::seed_from_u64(0);
        let net = ValueNetwork::new(3, 8, &mut rng);
        let blob = save(&net).unwrap();
        let restored: ValueNetwork = load(&blob).unwrap();
        assert_eq!(restored, net);
    }

    #[test]
    fn test_corrupt_blob_is_serialization_error() {
        let result: Result<ValueNetwork> = load(&[1, 2, 3]);
        assert!(matches!(result, Err(SacError::Serialization(_))));
    }
}
