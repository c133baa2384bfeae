use crate::geometry::turn_angle;
use crate::scenario::Waypoint;

pub const CRUISE_SPEED: f64 = 13.8;
/// Waypoints zeroed ahead of a halt point.
const HALT_RUN_UP: usize = 8;

/// Target speed for a waypoint whose neighbors deviate `deviation` degrees
/// from a straight line.
pub fn speed_for_deviation(deviation: f64) -> f64 {
    match deviation {
        d if d <= 10.0 => CRUISE_SPEED,
        d if d <= 30.0 => 10.0,
        d if d <= 50.0 => 8.5,
        d if d <= 70.0 => 6.0,
        d if d <= 90.0 => 3.0,
        _ => 2.0,
    }
}

/// Assign a speed to every waypoint from the local turn angle.
///
/// The first two waypoints cruise, the last one stops. Each speed is blended
/// into its predecessor's unless that one is a standstill. For every index in
/// `halts`, the run-up of up to eight waypoints before it is zeroed so the
/// participant comes to a halt there.
pub fn assign_speeds(waypoints: &mut [Waypoint], halts: &[usize]) {
    let n = waypoints.len();
    for i in 0..n {
        if i > 1 && i + 1 < n {
            if halts.contains(&i) {
                for w in &mut waypoints[i.saturating_sub(HALT_RUN_UP)..i] {
                    w.speed = 0.0;
                }
            }
            let angle = turn_angle(
                waypoints[i - 1].position,
                waypoints[i].position,
                waypoints[i + 1].position,
            );
            let speed = speed_for_deviation((angle - 180.0).abs());
            let prev = &mut waypoints[i - 1];
            if prev.speed != 0.0 {
                prev.speed = (speed + prev.speed) / 2.0;
            }
            waypoints[i].speed = speed;
        } else {
            waypoints[i].speed = if i + 1 == n { 0.0 } else { CRUISE_SPEED };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(points: &[[f64; 2]]) -> Vec<Waypoint> {
        points.iter().map(|&p| Waypoint::new(p, 0)).collect()
    }

    #[test]
    fn buckets_are_symmetric_in_turn_direction() {
        for deviation in [5.0, 25.0, 45.0, 65.0, 85.0, 120.0] {
            let left = speed_for_deviation((180.0 + deviation - 180.0_f64).abs());
            let right = speed_for_deviation((180.0 - deviation - 180.0_f64).abs());
            assert_eq!(left, right, "deviation {deviation}");
        }
        assert_eq!(speed_for_deviation(0.0), CRUISE_SPEED);
        assert_eq!(speed_for_deviation(90.0), 3.0);
        assert_eq!(speed_for_deviation(91.0), 2.0);
    }

    #[test]
    fn straight_line_cruises_then_stops() {
        let points: Vec<[f64; 2]> = (0..6).map(|i| [i as f64 * 2.0, 0.0]).collect();
        let mut waypoints = line(&points);
        assign_speeds(&mut waypoints, &[]);
        let speeds: Vec<f64> = waypoints.iter().map(|w| w.speed).collect();
        assert_eq!(speeds, vec![CRUISE_SPEED; 5].into_iter().chain([0.0]).collect::<Vec<_>>());
    }

    #[test]
    fn right_angle_slows_down() {
        let mut waypoints = line(&[[0.0, 0.0], [2.0, 0.0], [4.0, 0.0], [4.0, 2.0], [4.0, 4.0]]);
        assign_speeds(&mut waypoints, &[]);
        assert_eq!(waypoints[2].speed, 3.0);
    }

    #[test]
    fn halt_zeroes_the_run_up() {
        let points: Vec<[f64; 2]> = (0..14).map(|i| [i as f64 * 2.0, 0.0]).collect();
        let mut waypoints = line(&points);
        assign_speeds(&mut waypoints, &[10]);
        for w in &waypoints[2..10] {
            assert_eq!(w.speed, 0.0, "{w:?}");
        }
        assert_eq!(waypoints[10].speed, CRUISE_SPEED);
        assert_eq!(waypoints[1].speed, CRUISE_SPEED);
    }
}
