use crate::model::{Action, ActionKind, ActionMap};

/// Stage actions from `actions`, most recent first.
///
/// Ties on `start_time` keep input order; stages without a start time sort
/// after every dated stage.
#[must_use]
pub fn sort_stages<'a, I>(actions: I) -> Vec<&'a Action>
where
    I: IntoIterator<Item = &'a Action>,
{
    let mut stages: Vec<&'a Action> = actions
        .into_iter()
        .filter(|action| action.as_stage().is_some())
        .collect();
    // `sort_by` is stable.
    stages.sort_by(|lhs, rhs| rhs.start_time.cmp(&lhs.start_time));
    stages
}

/// Every action embedded in `stage`, depth first: each member followed by
/// its nested potential actions.
#[must_use]
pub fn stage_actions(stage: &Action) -> Vec<&Action> {
    let mut out = Vec::new();
    for member in stage.stage_members() {
        push_with_potential(member, &mut out);
    }
    out
}

fn push_with_potential<'a>(action: &'a Action, out: &mut Vec<&'a Action>) {
    out.push(action);
    for nested in &action.potential_action {
        push_with_potential(nested, out);
    }
}

/// First stage-embedded copy of `id`, searching stages most recent first.
#[must_use]
pub fn find_embedded<'a>(stages: &[&'a Action], id: &str) -> Option<&'a Action> {
    stages.iter().copied().find_map(|stage| {
        stage_actions(stage)
            .into_iter()
            .find(|action| action.id.as_str() == id)
    })
}

/// The live stage that produced `action`, if it is in the map.
#[must_use]
pub fn stage_of<'a>(action: &Action, action_map: &'a ActionMap) -> Option<&'a Action> {
    action
        .result_of
        .as_ref()
        .and_then(|stage_id| action_map.get(stage_id.as_str()))
        .filter(|stage| stage.as_stage().is_some())
}

/// Service actions produced in the same stage as `action`, excluding itself.
#[must_use]
pub fn sibling_service_actions<'a>(action: &Action, action_map: &'a ActionMap) -> Vec<&'a Action> {
    let Some(stage_id) = action.result_of.as_ref() else {
        return Vec::new();
    };
    action_map
        .iter()
        .filter(|candidate| candidate.id != action.id)
        .filter(|candidate| candidate.result_of.as_ref() == Some(stage_id))
        .filter(|candidate| candidate.service_output_of.is_some())
        .collect()
}

/// Upload actions serving `action`.
#[must_use]
pub fn uploads_for<'a>(action: &Action, action_map: &'a ActionMap) -> Vec<&'a Action> {
    action_map
        .iter()
        .filter(|candidate| matches!(candidate.kind, ActionKind::Upload(_)))
        .filter(|candidate| candidate.is_instrument_of(&action.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActionStatus, StageBody, UploadBody};
    use proptest::prelude::*;
    use time::OffsetDateTime;

    fn stage(id: &str, start_seconds: Option<i64>, members: Vec<Action>) -> Action {
        let mut action = Action::new(
            id,
            ActionStatus::Active,
            ActionKind::StartWorkflowStage(StageBody {
                identifier: None,
                result: members,
            }),
        );
        action.start_time = start_seconds.map(|seconds| {
            OffsetDateTime::from_unix_timestamp(seconds).unwrap_or(OffsetDateTime::UNIX_EPOCH)
        });
        action
    }

    #[test]
    fn most_recent_stage_comes_first_and_non_stages_are_dropped() {
        let actions = vec![
            stage("action:s1", Some(100), Vec::new()),
            Action::new("action:check", ActionStatus::Active, ActionKind::Check),
            stage("action:s2", Some(300), Vec::new()),
            stage("action:s3", None, Vec::new()),
        ];

        let ids: Vec<&str> = sort_stages(&actions)
            .into_iter()
            .map(|action| action.id.as_str())
            .collect();
        assert_eq!(ids, vec!["action:s2", "action:s1", "action:s3"]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let actions: Vec<Action> = Vec::new();
        assert!(sort_stages(&actions).is_empty());
    }

    #[test]
    fn embedded_lookup_prefers_most_recent_stage_and_descends_into_potential_actions() {
        let mut review = Action::new("action:review", ActionStatus::Active, ActionKind::Check);
        review.potential_action.push(Action::new(
            "action:authorize",
            ActionStatus::Potential,
            ActionKind::Check,
        ));
        let older_copy = Action::new("action:review", ActionStatus::Potential, ActionKind::Check);

        let actions = vec![
            stage("action:old", Some(10), vec![older_copy]),
            stage("action:new", Some(20), vec![review]),
        ];
        let stages = sort_stages(&actions);

        let found = find_embedded(&stages, "action:review");
        assert_eq!(found.map(|action| action.status), Some(ActionStatus::Active));
        assert!(find_embedded(&stages, "action:authorize").is_some());
        assert!(find_embedded(&stages, "action:missing").is_none());
    }

    #[test]
    fn service_siblings_share_the_stage() {
        let mut release = Action::new("action:release", ActionStatus::Active, ActionKind::Check);
        release.result_of = Some("action:stage".into());
        let mut same_stage = Action::new("action:svc", ActionStatus::Active, ActionKind::Check);
        same_stage.result_of = Some("action:stage".into());
        same_stage.service_output_of = Some("action:offer".into());
        let mut other_stage = same_stage.clone();
        other_stage.id = "action:svc-old".into();
        other_stage.result_of = Some("action:older".into());
        let mut upload = Action::new(
            "action:upload",
            ActionStatus::Active,
            ActionKind::Upload(UploadBody::default()),
        );
        upload.instrument_of = Some("action:release".into());

        let map = match ActionMap::from_actions(vec![release.clone(), same_stage, other_stage, upload])
        {
            Ok(map) => map,
            Err(err) => panic!("fixture map: {err}"),
        };

        let siblings = sibling_service_actions(&release, &map);
        assert_eq!(siblings.len(), 1);
        assert_eq!(siblings[0].id.as_str(), "action:svc");
        assert_eq!(uploads_for(&release, &map).len(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_stages_sorted_descending_and_stable(starts in prop::collection::vec(0i64..6, 0..24)) {
            let actions: Vec<Action> = starts
                .iter()
                .enumerate()
                .map(|(index, start)| stage(&format!("action:s{index}"), Some(*start), Vec::new()))
                .collect();

            let sorted = sort_stages(&actions);
            prop_assert_eq!(sorted.len(), actions.len());

            for pair in sorted.windows(2) {
                prop_assert!(pair[0].start_time >= pair[1].start_time);
                if pair[0].start_time == pair[1].start_time {
                    let lhs = actions.iter().position(|action| action.id == pair[0].id);
                    let rhs = actions.iter().position(|action| action.id == pair[1].id);
                    prop_assert!(lhs < rhs);
                }
            }
        }
    }
}
