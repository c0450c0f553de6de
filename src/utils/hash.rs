use crc32fast::Hasher;

/// CRC32 of a WAL frame. The checkpoint sequence salts the checksum so a
/// frame left over from before the last checkpoint never verifies.
pub fn calculate_frame_checksum(checkpoint_seq: u64, header: &[u8], payload: &[u8]) -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&checkpoint_seq.to_le_bytes());
    hasher.update(header);
    hasher.update(payload);

    hasher.finalize()
}

pub fn verify_frame_checksum(
    checkpoint_seq: u64,
    header: &[u8],
    payload: &[u8],
    expected_checksum: u32,
) -> bool {
    calculate_frame_checksum(checkpoint_seq, header, payload) == expected_checksum
}

/// CRC32 over a fixed header region (file header, WAL header).
pub fn calculate_header_checksum(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}
