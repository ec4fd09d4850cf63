/// Where the capture loop currently is in its scan/mark/display cycle.
///
/// `Stopped` is terminal; only a failed camera acquisition leaves the loop
/// startable again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    Scanning,
    Marking,
    Displaying,
    Stopped,
}
