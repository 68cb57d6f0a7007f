use crate::edge::EdgeState;
use crate::registry::{Direction, FrameGraph, FramePath};
use crate::{Transform, TransformErrors};
use kinematics::RigidBodyState;
use nalgebra::Vector3;
use rotations::prelude::*;

impl FrameGraph {
    /// Relative kinematics `to_from_from` along a resolved path.
    ///
    /// Constant edges ignore `at_time`. A time varying edge with no time is an error.
    pub fn path_state(&self, path: &FramePath, at_time: Option<f64>) -> Result<EdgeState, TransformErrors> {
        let mut state = EdgeState::fixed(Transform::IDENTITY);
        for hop in &path.hops {
            let edge = &self.edges[hop.edge].edge;
            let t = match (edge.is_time_varying(), at_time) {
                (true, None) => {
                    return Err(TransformErrors::StaleFrameTime {
                        from: self.frame_name(self.near_end(hop)).to_string(),
                        to: self.frame_name(self.far_end(hop)).to_string(),
                    });
                }
                (_, Some(t)) => t,
                (false, None) => 0.0,
            };
            let edge_state = edge.state_at(t);
            let hop_state = match hop.direction {
                Direction::Forward => edge_state,
                Direction::Reverse => edge_state.inv(),
            };
            state = hop_state.compose(&state);
        }
        Ok(state)
    }

    pub fn transform_at(&self, from: &str, to: &str, at_time: Option<f64>) -> Result<Transform, TransformErrors> {
        let path = self.resolve_path(from, to)?;
        Ok(self.path_state(&path, at_time)?.transform)
    }

    /// Free vector, rotation only.
    pub fn transform_vector(
        &self,
        v: &Vector3<f64>,
        from: &str,
        to: &str,
        at_time: Option<f64>,
    ) -> Result<Vector3<f64>, TransformErrors> {
        Ok(self.transform_at(from, to, at_time)?.transform_vector(v))
    }

    pub fn transform_point(
        &self,
        p: &Vector3<f64>,
        from: &str,
        to: &str,
        at_time: Option<f64>,
    ) -> Result<Vector3<f64>, TransformErrors> {
        Ok(self.transform_at(from, to, at_time)?.transform_point(p))
    }

    /// Re-expresses a full rigid body state in frame `to` at `state.t`.
    pub fn transform_state(&self, state: &RigidBodyState, to: &str) -> Result<RigidBodyState, TransformErrors> {
        let path = self.resolve_path(&state.frame, to)?;
        self.transform_state_along(state, &path)
    }

    /// As `transform_state`, reusing a path resolved once for many states.
    pub fn transform_state_along(
        &self,
        state: &RigidBodyState,
        path: &FramePath,
    ) -> Result<RigidBodyState, TransformErrors> {
        if state.frame != path.from {
            return Err(TransformErrors::FrameMismatch {
                state: state.frame.clone(),
                from: path.from.clone(),
            });
        }
        let relative = self.path_state(path, Some(state.t))?;
        let c = &relative.transform.rotation;
        let w = relative.angular_velocity;

        let position = relative.transform.transform_point(&state.position);
        let velocity = c.transform(&(state.velocity - relative.origin_velocity)) - w.cross(&position);

        // body_from_to = body_from_from * from_from_to
        let attitude = state
            .attitude
            .compose(&relative.transform.rotation.to_quaternion().inv());
        let angular_velocity = state.angular_velocity - attitude.transform(&w);

        Ok(RigidBodyState {
            position,
            velocity,
            attitude,
            angular_velocity,
            t: state.t,
            frame: path.to.clone(),
        })
    }
}
