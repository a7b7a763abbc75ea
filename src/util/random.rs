use crate::core::types::AccessId;

pub trait FromRandom {
    fn from_random() -> Self;
}

impl FromRandom for AccessId {
    fn from_random() -> Self {
        AccessId(random_string(16))
    }
}

/// `size` random bytes, base64 encoded.
fn random_string(size: usize) -> String {
    use rand::RngCore;

    let mut bytes = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::encode_config(bytes, base64::URL_SAFE_NO_PAD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn access_ids_are_128_bit_and_distinct() {
        let ids: HashSet<String> = (0..1000).map(|_| AccessId::from_random().0).collect();
        assert_eq!(ids.len(), 1000);
        for id in &ids {
            assert_eq!(base64::decode_config(id, base64::URL_SAFE_NO_PAD).unwrap().len(), 16);
            assert!(!id.contains(':'));
        }
    }
}
