//! Fixed-threshold gesture classification.
//!
//! Every bridge reduces a tracked hand to a handful of discrete categories by
//! comparing palm-to-fingertip distances and the palm normal against constants.
//! Distances are millimetres, normal components are unitless.
use strum_macros::{Display, EnumString};

use crate::tracking::{Hand, HandType, TrackingFrame};

/// Mean tip distance above which a hand counts as open.
pub const OPEN_MM: f64 = 70.0;
/// Mean tip distance below which a hand counts as closed.
pub const CLOSED_MM: f64 = 40.0;
/// Tip distance above which a single finger counts as extended.
pub const EXTENDED_MM: f64 = 40.0;
/// `|normal.x|` needed to register a sideways tilt when driving.
pub const DRIVE_TILT: f64 = 0.6;
/// `|normal.x|` needed to register a sideways tilt in the gesture file.
pub const FILE_TILT: f64 = 0.4;

/// Base wheel speed for straight motion (rpm).
pub const BASE_RPM: f64 = 70.0;
/// Speed removed from the inner wheel while turning (rpm).
pub const DELTA_TURN: f64 = 40.0;
/// Coarse limit applied to mapped wheel speeds before the client's own envelope.
pub const RPM_LIMIT: f64 = 999.0;

/// Tip distances mapped onto the servo range: `SERVO_NEAR_MM` → 255, `SERVO_FAR_MM` → 0.
pub const SERVO_NEAR_MM: f64 = 20.0;
#[allow(missing_docs)]
pub const SERVO_FAR_MM: f64 = 70.0;
/// Length of the animatronic hand buffer.
pub const SERVO_BUFFER_LEN: usize = 10;
/// Tip distance above which a finger reads as open on the animatronic arm.
pub const ARM_FINGER_MM: f64 = 45.0;

/// `|normal.x|` needed to register a roll in the hand-pose message.
pub const POSE_ROLL: f64 = 0.5;
/// `|normal.z|` needed to register a pitch in the hand-pose message.
pub const POSE_PITCH: f64 = 0.4;

const FINGER_NAMES: [&str; 5] = ["pulgar", "indice", "medio", "anular", "menique"];

/// Openness of a hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum HandShape {
    #[allow(missing_docs)]
    Open,
    #[allow(missing_docs)]
    Closed,
    /// Between the open and closed thresholds.
    Neutral,
}

impl HandShape {
    /// Classify a mean tip distance.
    pub fn from_openness(openness: f64) -> Self {
        if openness > OPEN_MM {
            HandShape::Open
        } else if openness < CLOSED_MM {
            HandShape::Closed
        } else {
            HandShape::Neutral
        }
    }

    /// Classify a hand; `None` when no digit has a tip.
    pub fn of(hand: &Hand) -> Option<Self> {
        openness(hand).map(Self::from_openness)
    }

    /// Single-byte command for the open/close serial bridge.
    pub fn serial_command(&self) -> u8 {
        match self {
            HandShape::Open => b'a',
            HandShape::Closed => b's',
            HandShape::Neutral => b'd',
        }
    }
}

/// Sideways tilt of the palm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Tilt {
    /// Palm normal points to +x.
    Left,
    /// Palm normal points to -x.
    Right,
}

impl Tilt {
    /// Tilt of `hand` when `|normal.x|` exceeds `threshold`.
    pub fn of(hand: &Hand, threshold: f64) -> Option<Self> {
        let x = hand.palm.normal.x;
        if x.abs() > threshold {
            Some(if x > 0.0 { Tilt::Left } else { Tilt::Right })
        } else {
            None
        }
    }
}

/// Mean palm-to-fingertip distance.
pub fn openness(hand: &Hand) -> Option<f64> {
    let distances = hand.tip_distances();
    if distances.is_empty() {
        return None;
    }
    Some(distances.iter().sum::<f64>() / distances.len() as f64)
}

/// Motion request derived from both hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveGesture {
    /// Open left hand: emergency stop.
    Stop,
    /// Open right hand.
    Forward(Option<Tilt>),
    /// Closed right hand.
    Backward(Option<Tilt>),
    /// Right hand neither open nor closed, or no right hand.
    Unknown(Option<Tilt>),
}

impl DriveGesture {
    /// Classify a tracking frame.
    ///
    /// An open left hand always wins. Otherwise the right hand's shape decides
    /// the direction and its tilt the turn.
    pub fn classify(frame: &TrackingFrame) -> Self {
        let mut gesture = DriveGesture::Unknown(None);
        let mut left_open = false;

        for hand in &frame.hands {
            let Some(shape) = HandShape::of(hand) else {
                continue;
            };
            match hand.hand_type {
                HandType::Left => {
                    if shape == HandShape::Open {
                        left_open = true;
                    }
                }
                HandType::Right => {
                    let tilt = Tilt::of(hand, DRIVE_TILT);
                    gesture = match shape {
                        HandShape::Open => DriveGesture::Forward(tilt),
                        HandShape::Closed => DriveGesture::Backward(tilt),
                        HandShape::Neutral => DriveGesture::Unknown(tilt),
                    };
                }
            }
        }

        if left_open {
            DriveGesture::Stop
        } else {
            gesture
        }
    }

    /// Wheel speeds `(left, right)` in rpm for this gesture.
    pub fn wheel_rpms(&self) -> (f64, f64) {
        let inner = BASE_RPM - DELTA_TURN;
        let (left, right) = match self {
            DriveGesture::Stop | DriveGesture::Unknown(_) => (0.0, 0.0),
            DriveGesture::Forward(None) => (BASE_RPM, BASE_RPM),
            DriveGesture::Forward(Some(Tilt::Right)) => (BASE_RPM, inner),
            DriveGesture::Forward(Some(Tilt::Left)) => (inner, BASE_RPM),
            DriveGesture::Backward(None) => (-BASE_RPM, -BASE_RPM),
            DriveGesture::Backward(Some(Tilt::Right)) => (-BASE_RPM, -inner),
            DriveGesture::Backward(Some(Tilt::Left)) => (-inner, -BASE_RPM),
        };
        (clamp_rpm(left), clamp_rpm(right))
    }
}

fn clamp_rpm(rpm: f64) -> f64 {
    rpm.clamp(-RPM_LIMIT, RPM_LIMIT)
}

/// Gesture label written by the gesture-file bridge.
///
/// The open left hand yields `parar`; the right hand yields `abierta` or
/// `cerrada` with an optional `_derecha`/`_izquierda` suffix. A neutral right
/// hand produces nothing.
pub fn file_label(frame: &TrackingFrame) -> Option<String> {
    let mut right_label = None;
    let mut stop = false;

    for hand in &frame.hands {
        let Some(shape) = HandShape::of(hand) else {
            continue;
        };
        match (hand.hand_type, shape) {
            (HandType::Left, HandShape::Open) => stop = true,
            (HandType::Left, _) => {}
            (HandType::Right, HandShape::Neutral) => {}
            (HandType::Right, shape) => {
                let mut label = if shape == HandShape::Open {
                    "abierta".to_string()
                } else {
                    "cerrada".to_string()
                };
                match Tilt::of(hand, FILE_TILT) {
                    Some(Tilt::Right) => label.push_str("_derecha"),
                    Some(Tilt::Left) => label.push_str("_izquierda"),
                    None => {}
                }
                right_label = Some(label);
            }
        }
    }

    if stop {
        Some("parar".to_string())
    } else {
        right_label
    }
}

/// Number of fingers whose tip is farther than `EXTENDED_MM` from the palm.
pub fn extended_fingers(hand: &Hand) -> usize {
    hand.tip_distances()
        .iter()
        .filter(|&&d| d > EXTENDED_MM)
        .count()
}

/// Letter sent by the finger-count bridge: `z` for a fist, `a`..`e` for 1..5.
pub fn finger_count_letter(count: usize) -> u8 {
    match count {
        0 => b'z',
        1 => b'a',
        2 => b'b',
        3 => b'c',
        4 => b'd',
        5 => b'e',
        _ => b'x',
    }
}

/// Right-hand label for the simulation bridges.
///
/// `abierta`, `cerrada` or `desconocida`, followed by ` izquierda` or
/// ` derecha` when the palm rolls past `DRIVE_TILT`. `None` without a right hand.
pub fn simulation_label(frame: &TrackingFrame) -> Option<String> {
    let hand = frame.hand(HandType::Right)?;
    let shape = HandShape::of(hand)?;
    let mut label = match shape {
        HandShape::Open => "abierta",
        HandShape::Closed => "cerrada",
        HandShape::Neutral => "desconocida",
    }
    .to_string();
    match Tilt::of(hand, DRIVE_TILT) {
        Some(Tilt::Left) => label.push_str(" izquierda"),
        Some(Tilt::Right) => label.push_str(" derecha"),
        None => {}
    }
    Some(label)
}

/// Whether any left hand in the frame is open.
pub fn left_hand_open(frame: &TrackingFrame) -> bool {
    frame
        .hands
        .iter()
        .filter(|hand| hand.hand_type == HandType::Left)
        .any(|hand| HandShape::of(hand) == Some(HandShape::Open))
}

/// Pose message for the simulated hand.
///
/// `mano=abierta` or `mano=cerrada` when every or no finger is extended,
/// otherwise one `dedo:abierto|cerrado` entry per finger joined by `;`. Then
/// ` izquierda`/` derecha` past `POSE_ROLL` and ` atras`/` adelante`/` centro`
/// against `POSE_PITCH`.
pub fn pose_message(hand: &Hand) -> String {
    let extended: Vec<bool> = hand
        .tip_distances()
        .iter()
        .map(|&d| d > EXTENDED_MM)
        .collect();
    let open = extended.iter().filter(|&&e| e).count();

    let mut message = if open == FINGER_NAMES.len() {
        "mano=abierta".to_string()
    } else if open == 0 {
        "mano=cerrada".to_string()
    } else {
        FINGER_NAMES
            .iter()
            .zip(&extended)
            .map(|(name, &e)| format!("{}:{}", name, if e { "abierto" } else { "cerrado" }))
            .collect::<Vec<_>>()
            .join(";")
    };

    match Tilt::of(hand, POSE_ROLL) {
        Some(Tilt::Left) => message.push_str(" izquierda"),
        Some(Tilt::Right) => message.push_str(" derecha"),
        None => {}
    }
    let pitch = hand.palm.normal.z;
    message.push_str(if pitch > POSE_PITCH {
        " atras"
    } else if pitch < -POSE_PITCH {
        " adelante"
    } else {
        " centro"
    });
    message
}

/// Servo position for one finger, rounded to the nearest multiple of ten.
///
/// Halves round to even at both steps, so 125 becomes 120.
pub fn servo_position(distance: f64) -> u8 {
    let t = ((distance - SERVO_NEAR_MM) / (SERVO_FAR_MM - SERVO_NEAR_MM)).clamp(0.0, 1.0);
    let raw = (255.0 * (1.0 - t)).round_ties_even().clamp(0.0, 255.0);
    round_to_ten(raw)
}

fn round_to_ten(raw: f64) -> u8 {
    // 255 rounds up to 260, which no longer fits in a byte.
    ((raw / 10.0).round_ties_even() * 10.0).min(255.0) as u8
}

/// Map `value` from `[low, high]` onto `0..=255`, clamping and truncating.
fn servo_range(value: f64, low: f64, high: f64) -> u8 {
    (255.0 * (value - low) / (high - low)).clamp(0.0, 255.0) as u8
}

/// Ten-byte frame for the animatronic hand.
///
/// Layout: start byte, three wrist/forearm servos at mid position, then thumb
/// (twice), index, middle, ring and pinky. `None` unless the hand has five tips.
pub fn servo_buffer(hand: &Hand) -> Option<[u8; SERVO_BUFFER_LEN]> {
    let distances = hand.tip_distances();
    if distances.len() < 5 {
        return None;
    }
    let fingers: Vec<u8> = distances.iter().map(|&d| servo_position(d)).collect();
    Some([
        255, 127, 127, 127, fingers[0], fingers[0], fingers[1], fingers[2], fingers[3],
        fingers[4],
    ])
}

/// Ten-byte frame for the animatronic arm.
///
/// Same layout as [`servo_buffer`], but the forearm follows `direction.y`, the
/// wrist deviation `normal.z` and the wrist extension `normal.x`, and each
/// finger is either 0 or 255 around `ARM_FINGER_MM`.
pub fn arm_buffer(hand: &Hand) -> Option<[u8; SERVO_BUFFER_LEN]> {
    let distances = hand.tip_distances();
    if distances.len() < 5 {
        return None;
    }
    let fingers: Vec<u8> = distances
        .iter()
        .map(|&d| if d > ARM_FINGER_MM { 255 } else { 0 })
        .collect();
    let palm = &hand.palm;
    Some([
        255,
        servo_range(palm.direction.y, -0.7, 0.7),
        servo_range(palm.normal.z, -0.7, 0.7),
        servo_range(palm.normal.x, -0.8, 0.8),
        fingers[0],
        fingers[0],
        fingers[1],
        fingers[2],
        fingers[3],
        fingers[4],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::fixtures::hand;

    fn frame(hands: Vec<Hand>) -> TrackingFrame {
        TrackingFrame { frame_id: 1, hands }
    }

    #[test]
    fn shape_thresholds_are_strict() {
        assert_eq!(HandShape::from_openness(70.1), HandShape::Open);
        assert_eq!(HandShape::from_openness(70.0), HandShape::Neutral);
        assert_eq!(HandShape::from_openness(40.0), HandShape::Neutral);
        assert_eq!(HandShape::from_openness(39.9), HandShape::Closed);
    }

    #[test]
    fn open_right_hand_drives_forward() {
        let right = hand(HandType::Right, [80.0; 5], 0.0);
        let gesture = DriveGesture::classify(&frame(vec![right]));
        assert_eq!(gesture, DriveGesture::Forward(None));
        assert_eq!(gesture.wheel_rpms(), (70.0, 70.0));
    }

    #[test]
    fn tilted_hands_turn() {
        let tilted_left = hand(HandType::Right, [80.0; 5], 0.7);
        let tilted_right = hand(HandType::Right, [20.0; 5], -0.7);
        assert_eq!(
            DriveGesture::classify(&frame(vec![tilted_left])).wheel_rpms(),
            (30.0, 70.0)
        );
        assert_eq!(
            DriveGesture::classify(&frame(vec![tilted_right])).wheel_rpms(),
            (-70.0, -30.0)
        );
        assert_eq!(
            DriveGesture::Forward(Some(Tilt::Right)).wheel_rpms(),
            (70.0, 30.0)
        );
        assert_eq!(
            DriveGesture::Backward(Some(Tilt::Left)).wheel_rpms(),
            (-30.0, -70.0)
        );
    }

    #[test]
    fn small_tilt_is_ignored_for_driving() {
        let right = hand(HandType::Right, [20.0; 5], 0.5);
        assert_eq!(
            DriveGesture::classify(&frame(vec![right])),
            DriveGesture::Backward(None)
        );
    }

    #[test]
    fn open_left_hand_stops() {
        let left = hand(HandType::Left, [90.0; 5], 0.0);
        let right = hand(HandType::Right, [90.0; 5], 0.0);
        let gesture = DriveGesture::classify(&frame(vec![right, left]));
        assert_eq!(gesture, DriveGesture::Stop);
        assert_eq!(gesture.wheel_rpms(), (0.0, 0.0));
    }

    #[test]
    fn missing_or_neutral_right_hand_is_unknown() {
        assert_eq!(
            DriveGesture::classify(&frame(vec![])),
            DriveGesture::Unknown(None)
        );
        let neutral = hand(HandType::Right, [55.0; 5], 0.0);
        let gesture = DriveGesture::classify(&frame(vec![neutral]));
        assert_eq!(gesture, DriveGesture::Unknown(None));
        assert_eq!(gesture.wheel_rpms(), (0.0, 0.0));
    }

    #[test]
    fn file_labels() {
        let right = hand(HandType::Right, [80.0; 5], -0.45);
        assert_eq!(
            file_label(&frame(vec![right.clone()])).as_deref(),
            Some("abierta_derecha")
        );
        let closed = hand(HandType::Right, [30.0; 5], 0.45);
        assert_eq!(
            file_label(&frame(vec![closed])).as_deref(),
            Some("cerrada_izquierda")
        );
        let left = hand(HandType::Left, [80.0; 5], 0.0);
        assert_eq!(
            file_label(&frame(vec![right, left])).as_deref(),
            Some("parar")
        );
        let neutral = hand(HandType::Right, [50.0; 5], 0.0);
        assert_eq!(file_label(&frame(vec![neutral])), None);
    }

    #[test]
    fn counts_extended_fingers() {
        let two = hand(HandType::Right, [50.0, 45.0, 10.0, 40.0, 5.0], 0.0);
        assert_eq!(extended_fingers(&two), 2);
        assert_eq!(finger_count_letter(extended_fingers(&two)), b'b');
        assert_eq!(finger_count_letter(0), b'z');
        assert_eq!(finger_count_letter(5), b'e');
        assert_eq!(finger_count_letter(6), b'x');
    }

    #[test]
    fn serial_commands_per_shape() {
        assert_eq!(HandShape::Open.serial_command(), b'a');
        assert_eq!(HandShape::Closed.serial_command(), b's');
        assert_eq!(HandShape::Neutral.serial_command(), b'd');
    }

    #[test]
    fn servo_mapping() {
        assert_eq!(servo_position(10.0), 255);
        assert_eq!(servo_position(20.0), 255);
        assert_eq!(servo_position(45.0), 130);
        assert_eq!(servo_position(70.0), 0);
        assert_eq!(servo_position(100.0), 0);
        // 255 * (1 - 0.1) = 229.5 -> 230
        assert_eq!(servo_position(25.0), 230);
    }

    #[test]
    fn servo_halves_round_to_even() {
        assert_eq!(round_to_ten(125.0), 120);
        assert_eq!(round_to_ten(135.0), 140);
        assert_eq!(round_to_ten(25.0), 20);
        assert_eq!(round_to_ten(124.0), 120);
        assert_eq!(round_to_ten(255.0), 255);
    }

    #[test]
    fn simulation_labels() {
        let open_left_tilt = hand(HandType::Right, [80.0; 5], 0.7);
        assert_eq!(
            simulation_label(&frame(vec![open_left_tilt])).as_deref(),
            Some("abierta izquierda")
        );
        let closed = hand(HandType::Right, [20.0; 5], -0.5);
        assert_eq!(
            simulation_label(&frame(vec![closed])).as_deref(),
            Some("cerrada")
        );
        let neutral = hand(HandType::Right, [50.0; 5], -0.9);
        assert_eq!(
            simulation_label(&frame(vec![neutral])).as_deref(),
            Some("desconocida derecha")
        );
        assert_eq!(simulation_label(&frame(vec![])), None);

        assert!(left_hand_open(&frame(vec![hand(HandType::Left, [80.0; 5], 0.0)])));
        assert!(!left_hand_open(&frame(vec![hand(HandType::Left, [50.0; 5], 0.0)])));
        assert!(!left_hand_open(&frame(vec![hand(HandType::Right, [80.0; 5], 0.0)])));
    }

    #[test]
    fn pose_messages() {
        let open = hand(HandType::Right, [60.0; 5], 0.0);
        assert_eq!(pose_message(&open), "mano=abierta centro");

        let mut fist = hand(HandType::Right, [10.0; 5], 0.6);
        fist.palm.normal.z = 0.5;
        assert_eq!(pose_message(&fist), "mano=cerrada izquierda atras");

        let mut two = hand(HandType::Right, [60.0, 60.0, 10.0, 10.0, 10.0], -0.6);
        two.palm.normal.z = -0.5;
        assert_eq!(
            pose_message(&two),
            "pulgar:abierto;indice:abierto;medio:cerrado;anular:cerrado;menique:cerrado derecha adelante"
        );
    }

    #[test]
    fn arm_buffer_layout() {
        let mut right = hand(HandType::Right, [50.0, 45.0, 80.0, 10.0, 46.0], 0.8);
        right.palm.direction.y = -0.7;
        right.palm.normal.z = 0.0;
        assert_eq!(
            arm_buffer(&right),
            Some([255, 0, 127, 255, 255, 255, 0, 255, 0, 255])
        );

        right.palm.direction.y = 2.0;
        right.palm.normal.x = -1.0;
        assert_eq!(arm_buffer(&right).map(|b| (b[1], b[3])), Some((255, 0)));
    }

    #[test]
    fn servo_buffer_layout() {
        let right = hand(HandType::Right, [70.0, 20.0, 45.0, 70.0, 20.0], 0.0);
        assert_eq!(
            servo_buffer(&right),
            Some([255, 127, 127, 127, 0, 0, 255, 130, 0, 255])
        );
    }
}
