//! CocoaPods latest version resolver

use crate::version::resolver::LatestVersionResolver;

/// CocoaPods latest version resolver
///
/// Uses default implementation (semantic max version). Pods frequently use
/// two-component versions ("4.0"), which the shared parser pads.
pub struct CocoaPodsLatestResolver;

impl LatestVersionResolver for CocoaPodsLatestResolver {
    // Uses default implementation (semantic max)
}
