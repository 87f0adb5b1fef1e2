// The scenario mini-language: `===`-delimited sections, each an
// optional `t=`/`title:`/`description:` header followed by a handful of
// bootstrap actions (`grid`, `import`, `<a> openAccount <b>`, `payRandom`).
// `parse_scenario` never executes anything — a scenario with any parse
// error is reported back to the caller instead of run, matching the rule
// that a malformed scenario does not partially apply.

use xln_base::{Amount, EntityId, JurisdictionName, SignerId};
use xln_entity::{EntityReplica, EntityTx, ReplicaConfig};
use xln_gossip::Position;
use xln_jurisdiction::{EvmType, Jurisdiction};
use xln_vers::{AutoGrid, EntityIdKind, EntityInput, ReplicaKey, RuntimeTx, TickOutcome};

use crate::environment::Environment;
use crate::tick::{apply_runtime_tx, process, tick};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScenarioSection {
    pub timestamp: Option<u64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub actions: Vec<ScenarioAction>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScenarioAction {
    Grid { n: u64, m: Option<u64>, k: Option<u64>, id_kind: EntityIdKind },
    Import { range: (u64, u64) },
    OpenAccount { from: u64, to: u64 },
    PayRandom { count: u64, amount: i64, min_hops: u64, max_hops: u64 },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scenario {
    pub sections: Vec<ScenarioSection>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioResult {
    pub success: bool,
    pub frames_generated: u64,
    pub errors: Option<Vec<String>>,
}

/// Splits `text` into `===`-delimited sections and parses each action
/// line. Never touches an `Environment` — see `execute_scenario` for that.
pub fn parse_scenario(text: &str) -> (Scenario, Vec<String>) {
    let mut errors = Vec::new();
    let mut sections = Vec::new();
    let mut current: Option<ScenarioSection> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("===") {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            current = Some(ScenarioSection::default());
            continue;
        }

        let section = current.get_or_insert_with(ScenarioSection::default);
        if let Some(rest) = line.strip_prefix("t=") {
            match rest.trim().parse::<u64>() {
                Ok(ts) => section.timestamp = Some(ts),
                Err(_) => errors.push(format!("invalid timestamp: {line}")),
            }
        } else if let Some(rest) = line.strip_prefix("title:") {
            section.title = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("description:") {
            section.description = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("grid ") {
            match parse_grid(rest) {
                Ok(action) => section.actions.push(action),
                Err(e) => errors.push(e),
            }
        } else if let Some(rest) = line.strip_prefix("import ") {
            match parse_import(rest) {
                Ok(action) => section.actions.push(action),
                Err(e) => errors.push(e),
            }
        } else if line.contains(" openAccount ") {
            match parse_open_account(line) {
                Ok(action) => section.actions.push(action),
                Err(e) => errors.push(e),
            }
        } else if let Some(rest) = line.strip_prefix("payRandom") {
            match parse_pay_random(rest.trim()) {
                Ok(action) => section.actions.push(action),
                Err(e) => errors.push(e),
            }
        } else {
            errors.push(format!("unknown action: {line}"));
        }
    }
    if let Some(section) = current.take() {
        sections.push(section);
    }

    (Scenario { sections }, errors)
}

fn parse_grid(rest: &str) -> Result<ScenarioAction, String> {
    let mut id_kind = EntityIdKind::Numbered;
    let mut positional = Vec::new();
    for token in rest.split_whitespace() {
        if let Some((key, value)) = token.split_once('=') {
            if key != "type" {
                return Err(format!("unknown grid option: {key}"));
            }
            id_kind = match value {
                "lazy" => EntityIdKind::Lazy,
                "numbered" => EntityIdKind::Numbered,
                other => return Err(format!("unknown grid id type: {other}")),
            };
        } else {
            positional.push(token);
        }
    }
    let n = positional
        .first()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| "grid requires an entity count".to_string())?;
    let m = positional.get(1).and_then(|s| s.parse::<u64>().ok());
    let k = positional.get(2).and_then(|s| s.parse::<u64>().ok());
    Ok(ScenarioAction::Grid { n, m, k, id_kind })
}

fn parse_import(rest: &str) -> Result<ScenarioAction, String> {
    let rest = rest.trim();
    let (a, b) = rest.split_once('-').unwrap_or((rest, rest));
    let start = a.trim().parse::<u64>().map_err(|_| format!("invalid import range start: {a}"))?;
    let end = b.trim().parse::<u64>().map_err(|_| format!("invalid import range end: {b}"))?;
    Ok(ScenarioAction::Import { range: (start, end) })
}

fn parse_open_account(line: &str) -> Result<ScenarioAction, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 3 || parts[1] != "openAccount" {
        return Err(format!("malformed openAccount action: {line}"));
    }
    let from = parts[0].parse::<u64>().map_err(|_| format!("invalid entity index: {}", parts[0]))?;
    let to = parts[2].parse::<u64>().map_err(|_| format!("invalid entity index: {}", parts[2]))?;
    Ok(ScenarioAction::OpenAccount { from, to })
}

fn parse_pay_random(rest: &str) -> Result<ScenarioAction, String> {
    let mut count = None;
    let mut amount = None;
    let mut min_hops = 1u64;
    let mut max_hops = 1u64;
    for token in rest.split_whitespace() {
        let (key, value) = token.split_once('=').ok_or_else(|| format!("malformed payRandom option: {token}"))?;
        match key {
            "count" => count = value.parse::<u64>().ok(),
            "amount" => amount = value.parse::<i64>().ok(),
            "minHops" => min_hops = value.parse::<u64>().unwrap_or(1),
            "maxHops" => max_hops = value.parse::<u64>().unwrap_or(1),
            other => return Err(format!("unknown payRandom option: {other}")),
        }
    }
    let count = count.ok_or_else(|| "payRandom requires count=".to_string())?;
    let amount = amount.ok_or_else(|| "payRandom requires amount=".to_string())?;
    Ok(ScenarioAction::PayRandom { count, amount, min_hops, max_hops })
}

/// Runs a parsed scenario section by section, one tick per action. Assumes
/// `scenario` carries no parse errors — callers should check
/// `parse_scenario`'s error list before reaching for this.
pub fn execute_scenario(env: &mut Environment, scenario: &Scenario) -> ScenarioResult {
    let mut frames_generated = 0u64;
    let mut errors = Vec::new();
    let mut now_ms = 0u64;
    let mut rng_state: u64 = 0x9E37_79B9_7F4A_7C15;

    for section in &scenario.sections {
        if let Some(ts) = section.timestamp {
            now_ms = ts;
        }
        for action in &section.actions {
            let outcomes = match action {
                ScenarioAction::Grid { n, m, k, id_kind } => {
                    let base = active_or_default_xlnomy(env);
                    apply_auto_grid(env, &base, &AutoGrid { n: *n, m: *m, k: *k, id_kind: *id_kind });
                    tick(env, now_ms)
                }
                ScenarioAction::Import { range } => {
                    let base = active_or_default_xlnomy(env);
                    for index in range.0..=range.1 {
                        import_numbered_replica(env, index, &base);
                    }
                    tick(env, now_ms)
                }
                ScenarioAction::OpenAccount { from, to } => process(
                    env,
                    vec![EntityInput {
                        entity_id: EntityId::numbered(*from),
                        signer_id: SignerId("s".to_string()),
                        entity_txs: vec![EntityTx::OpenAccount { target: EntityId::numbered(*to) }],
                    }],
                    now_ms,
                ),
                ScenarioAction::PayRandom { count, amount, min_hops, max_hops } => {
                    let mut produced = Vec::new();
                    let mut entities: Vec<EntityId> = env.e_replicas.keys().map(|k| k.entity).collect();
                    entities.sort();
                    entities.dedup();
                    for _ in 0..*count {
                        if entities.len() < 2 {
                            break;
                        }
                        let hops = pick_hops(&mut rng_state, *min_hops, *max_hops, entities.len());
                        let start = (next_u64(&mut rng_state) as usize) % (entities.len() - hops);
                        let route: Vec<EntityId> = entities[start..=start + hops].to_vec();
                        let from_id = route[0];
                        let target_id = *route.last().expect("route always has at least two entities");
                        let outcomes = process(
                            env,
                            vec![EntityInput {
                                entity_id: from_id,
                                signer_id: SignerId("s".to_string()),
                                entity_txs: vec![EntityTx::DirectPayment {
                                    target: target_id,
                                    token: xln_base::TokenId(0),
                                    amount: Amount::from(*amount),
                                    route,
                                    description: "payRandom".to_string(),
                                    hop_index: 0,
                                }],
                            }],
                            now_ms,
                        );
                        frames_generated += 1;
                        produced.extend(outcomes);
                    }
                    produced
                }
            };
            if !matches!(action, ScenarioAction::PayRandom { .. }) {
                frames_generated += 1;
            }
            collect_errors(&outcomes, &mut errors);
        }
    }

    ScenarioResult {
        success: errors.is_empty(),
        frames_generated,
        errors: if errors.is_empty() { None } else { Some(errors) },
    }
}

fn active_or_default_xlnomy(env: &mut Environment) -> JurisdictionName {
    if let Some(name) = &env.active_xlnomy {
        return name.clone();
    }
    let name = JurisdictionName::from("default");
    env.xlnomies.entry(name.clone()).or_insert_with(|| Jurisdiction::new(name.clone(), EvmType::BrowserVm, 1000));
    env.active_xlnomy = Some(name.clone());
    name
}

fn import_numbered_replica(env: &mut Environment, index: u64, jurisdiction: &JurisdictionName) {
    let signer = SignerId("s".to_string());
    apply_runtime_tx(
        env,
        &RuntimeTx::ImportReplica {
            entity_id: EntityId::numbered(index),
            signer_id: signer.clone(),
            config: ReplicaConfig::single_signer(jurisdiction.clone(), signer),
            is_proposer: true,
            position: Position::default(),
        },
    );
}

/// `grid <n> [<m>] [<k>]`: mints an `n x m` lattice of
/// single-signer entities, optionally spread `k`-per-jurisdiction across
/// sibling jurisdictions named `{base}-1`, `{base}-2`, ... Best-effort
/// convenience for the DSL; an explicit `import` range remains the
/// unambiguous way to bring up replicas one at a time.
pub(crate) fn apply_auto_grid(env: &mut Environment, base_name: &JurisdictionName, grid: &AutoGrid) {
    let total = (grid.n * grid.m.unwrap_or(1)).max(1);
    let chunk_size = grid.k.unwrap_or(total).max(1);
    let (evm_type, block_delay_ms) =
        env.xlnomies.get(base_name).map(|j| (j.evm_type, j.block_delay_ms)).unwrap_or((EvmType::BrowserVm, 1000));

    for index in 1..=total {
        let chunk = (index - 1) / chunk_size;
        let jurisdiction_name =
            if chunk == 0 { base_name.clone() } else { JurisdictionName(format!("{}-{chunk}", base_name.0)) };
        env.xlnomies
            .entry(jurisdiction_name.clone())
            .or_insert_with(|| Jurisdiction::new(jurisdiction_name.clone(), evm_type, block_delay_ms));

        let entity_id = match grid.id_kind {
            EntityIdKind::Numbered => EntityId::numbered(index),
            EntityIdKind::Lazy => EntityId::lazy(&jurisdiction_name, &format!("grid-{index}"), 0),
        };
        let signer = SignerId("s".to_string());
        let key = ReplicaKey::new(entity_id, signer.clone());
        env.e_replicas.entry(key).or_insert_with(|| {
            EntityReplica::new(
                entity_id,
                signer.clone(),
                ReplicaConfig::single_signer(jurisdiction_name.clone(), signer),
                true,
                Position::default(),
            )
        });
    }
}

fn collect_errors(outcomes: &[TickOutcome], errors: &mut Vec<String>) {
    for outcome in outcomes {
        if let TickOutcome::Err { kind, detail } = outcome {
            errors.push(format!("{kind}: {detail}"));
        }
    }
}

fn next_u64(state: &mut u64) -> u64 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    *state
}

fn pick_hops(state: &mut u64, min_hops: u64, max_hops: u64, entity_count: usize) -> usize {
    let span = max_hops.saturating_sub(min_hops) + 1;
    let hops = min_hops + (next_u64(state) % span);
    (hops as usize).clamp(1, entity_count.saturating_sub(1))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unknown_action_is_reported_as_a_parse_error() {
        let (_scenario, errors) = parse_scenario("===\nt=0\nfrobnicate everything\n");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("frobnicate"));
    }

    #[test]
    fn sections_split_on_triple_equals_and_capture_headers() {
        let text = "===\nt=10\ntitle: first\ngrid 3\n===\nt=20\nimport 1-3\n";
        let (scenario, errors) = parse_scenario(text);
        assert!(errors.is_empty());
        assert_eq!(scenario.sections.len(), 2);
        assert_eq!(scenario.sections[0].timestamp, Some(10));
        assert_eq!(scenario.sections[0].title.as_deref(), Some("first"));
        assert_eq!(scenario.sections[0].actions, vec![ScenarioAction::Grid { n: 3, m: None, k: None, id_kind: EntityIdKind::Numbered }]);
    }

    #[test]
    fn open_account_line_parses_from_and_to() {
        let (scenario, errors) = parse_scenario("===\n1 openAccount 2\n");
        assert!(errors.is_empty());
        assert_eq!(scenario.sections[0].actions, vec![ScenarioAction::OpenAccount { from: 1, to: 2 }]);
    }

    #[test]
    fn grid_then_open_account_then_pay_random_executes_without_errors() {
        let text = "===\ntitle: line topology\ngrid 5\nimport 1-5\n1 openAccount 2\n2 openAccount 3\n3 openAccount 4\n4 openAccount 5\npayRandom count=2 amount=10 minHops=1 maxHops=2\n";
        let (scenario, parse_errors) = parse_scenario(text);
        assert!(parse_errors.is_empty());

        let mut env = Environment::new(xln_admin::Config::default());
        let result = execute_scenario(&mut env, &scenario);
        // Freshly opened accounts start at zero credit limit, so payRandom's
        // payments are expected to fail on InsufficientCapacity here; what
        // this exercises is that every action still produces a tick.
        assert!(result.frames_generated > 0);
    }
}
