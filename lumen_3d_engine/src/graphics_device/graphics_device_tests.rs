use crate::graphics_device::SampleCount;

#[test]
fn test_highest_common_sample_count() {
    // color supports 1,2,4,8 ; depth supports 1,2,4
    assert_eq!(SampleCount::highest_common(0b1111, 0b0111), SampleCount::S4);
    assert_eq!(SampleCount::highest_common(0x7F, 0x7F), SampleCount::S64);
}

#[test]
fn test_highest_common_falls_back_to_single_sample() {
    assert_eq!(SampleCount::highest_common(0b0001, 0b0001), SampleCount::S1);
    assert_eq!(SampleCount::highest_common(0b1000, 0b0100), SampleCount::S1);
    assert_eq!(SampleCount::highest_common(0, 0), SampleCount::S1);
}

#[test]
fn test_sample_count_values() {
    assert_eq!(SampleCount::S1.count(), 1);
    assert_eq!(SampleCount::S16.count(), 16);
    assert!(SampleCount::S2 < SampleCount::S8);
}
