use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use rand::Rng;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tui_dispatch::{
    EffectContext, EffectStoreLike, EffectStoreWithMiddleware, EventBus, EventKind,
    HandlerResponse, Keybindings, TaskKey,
};
use tui_dispatch_debug::debug::DebugLayer;
use tui_dispatch_debug::{
    DebugCliArgs, DebugRunOutput, DebugSession, DebugSessionError, ReplayItem,
};

use pokedex::action::Action;
use pokedex::api;
use pokedex::effect::Effect;
use pokedex::reducer::reducer;
use pokedex::sprite;
use pokedex::state::AppState;
use pokedex::ui::{DexComponentId, DexContext, DexUi};

#[derive(Parser, Debug)]
#[command(name = "pokedex")]
#[command(about = "Pokedex TUI backed by PokeAPI")]
struct Args {
    #[command(flatten)]
    debug: DebugCliArgs,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();
    let debug = DebugSession::new(args.debug);

    let state = debug
        .load_state_or_else_async(|| async { Ok::<AppState, io::Error>(AppState::default()) })
        .await
        .map_err(debug_error)?;
    let replay_actions = debug.load_replay_items().map_err(debug_error)?;
    let (middleware, recorder) = debug.middleware_with_recorder();
    let store = EffectStoreWithMiddleware::new(state, reducer, middleware);

    let use_alt_screen = debug.use_alt_screen();
    let mut stdout = io::stdout();
    if use_alt_screen {
        enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &debug, store, replay_actions).await;

    if use_alt_screen {
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
    }

    let run_output = result?;
    run_output.write_render_output()?;
    debug.save_actions(recorder.as_ref()).map_err(debug_error)?;
    Ok(())
}

fn debug_error(error: DebugSessionError) -> io::Error {
    io::Error::other(format!("debug session error: {error}"))
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    debug: &DebugSession,
    store: impl EffectStoreLike<AppState, Action, Effect>,
    replay_actions: Vec<ReplayItem<Action>>,
) -> io::Result<DebugRunOutput<AppState>> {
    let ui = Rc::new(RefCell::new(DexUi::new()));
    let mut bus: EventBus<AppState, Action, DexComponentId, DexContext> = EventBus::new();
    let keybindings: Keybindings<DexContext> = Keybindings::new();

    let ui_list = Rc::clone(&ui);
    bus.register(DexComponentId::List, move |event, state| {
        ui_list.borrow_mut().handle_list_event(&event.kind, state)
    });

    let ui_detail = Rc::clone(&ui);
    bus.register(DexComponentId::Detail, move |event, state| {
        ui_detail
            .borrow_mut()
            .handle_detail_event(&event.kind, state)
    });

    let ui_evo = Rc::clone(&ui);
    bus.register(DexComponentId::Evolution, move |event, state| {
        ui_evo
            .borrow_mut()
            .handle_evolution_event(&event.kind, state)
    });

    let ui_search = Rc::clone(&ui);
    bus.register(DexComponentId::Search, move |event, state| {
        ui_search
            .borrow_mut()
            .handle_search_event(&event.kind, state)
    });

    bus.register_global(|event, state| match event.kind {
        EventKind::Resize(width, height) => {
            HandlerResponse::action(Action::UiTerminalResize(width, height)).with_render()
        }
        EventKind::Key(key) => match key.code {
            crossterm::event::KeyCode::Char('q') if !state.search.active => {
                HandlerResponse::action(Action::Quit)
            }
            crossterm::event::KeyCode::Tab => HandlerResponse::action(Action::FocusNext),
            crossterm::event::KeyCode::BackTab => HandlerResponse::action(Action::FocusPrev),
            crossterm::event::KeyCode::Char('/') if !state.search.active => {
                HandlerResponse::action(Action::SearchStart)
            }
            crossterm::event::KeyCode::Char('r') if !state.search.active => {
                HandlerResponse::action(Action::RandomPick)
            }
            _ => HandlerResponse::ignored(),
        },
        _ => HandlerResponse::ignored(),
    });

    debug
        .run_effect_app_with_bus(
            terminal,
            store,
            DebugLayer::simple(),
            replay_actions,
            Some(Action::Init),
            Some(Action::Quit),
            |runtime| {
                if debug.render_once() {
                    return;
                }
                runtime
                    .subscriptions()
                    .interval("tick", Duration::from_millis(120), || Action::Tick);
            },
            &mut bus,
            &keybindings,
            |frame, area, state, render_ctx, event_ctx| {
                ui.borrow_mut()
                    .render(frame, area, state, render_ctx, event_ctx);
            },
            |action| matches!(action, Action::Quit),
            handle_effect,
        )
        .await
}

fn handle_effect(effect: Effect, ctx: &mut EffectContext<Action>) {
    match effect {
        Effect::LoadCatalog => {
            ctx.tasks().spawn(TaskKey::new("catalog"), async {
                match api::fetch_species_catalog().await {
                    Ok(entries) => Action::CatalogDidLoad(entries),
                    Err(error) => Action::CatalogDidError(error),
                }
            });
        }
        Effect::LoadBatch {
            start_id,
            count,
            seq,
        } => {
            let key = format!("batch_{seq}");
            ctx.tasks().spawn(TaskKey::new(key), async move {
                let (records, dropped) = api::fetch_record_batch(start_id, count).await;
                Action::BatchDidLoad {
                    seq,
                    records,
                    dropped,
                }
            });
        }
        Effect::RunSearch { plan, seq } => {
            let key = format!("search_{seq}");
            ctx.tasks().spawn(TaskKey::new(key), async move {
                match api::run_search(plan).await {
                    Ok(records) => Action::SearchDidLoad { seq, records },
                    Err(error) => Action::SearchDidError { seq, error },
                }
            });
        }
        Effect::LoadRandom { max_id, seq } => {
            let key = format!("random_{seq}");
            ctx.tasks().spawn(TaskKey::new(key), async move {
                let id = rand::rng().random_range(1..=max_id);
                match api::fetch_record_full(&id.to_string()).await {
                    Ok(record) => Action::RandomDidLoad { seq, record },
                    Err(error) => Action::RandomDidError { seq, error },
                }
            });
        }
        Effect::LoadEvolution { id } => {
            let key = format!("evo_{id}");
            ctx.tasks().spawn(TaskKey::new(key), async move {
                match api::fetch_evolution_stages(&id).await {
                    Ok(stages) => Action::EvolutionDidLoad { id, stages },
                    Err(error) => Action::EvolutionDidError { id, error },
                }
            });
        }
        Effect::RefreshRecord { id } => {
            let key = format!("record_{id}");
            ctx.tasks().spawn(TaskKey::new(key), async move {
                match api::fetch_record_full(&id.to_string()).await {
                    Ok(record) => Action::RecordDidRefresh(record),
                    Err(error) => Action::RecordRefreshDidError { id, error },
                }
            });
        }
        Effect::LoadSprite { id, url } => {
            let key = format!("sprite_{id}");
            ctx.tasks().spawn(TaskKey::new(key), async move {
                match api::fetch_bytes(&url).await {
                    Ok(bytes) => match sprite::decode_sprite(&bytes) {
                        Ok(sprite) => Action::SpriteDidLoad { id, sprite },
                        Err(error) => Action::SpriteDidError {
                            id,
                            error: api::ApiError::Fetch(error),
                        },
                    },
                    Err(error) => Action::SpriteDidError { id, error },
                }
            });
        }
    }
}
