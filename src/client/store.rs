use tokio::sync::watch;

/// Sub-view shown inside the auth modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalType {
    #[default]
    SignIn,
    SignUp,
    ConfirmSignUp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModalState {
    pub kind: ModalType,
    pub open: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientState {
    pub auth: AuthState,
    pub modal: ModalState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetCredentials { access_token: String },
    LogOut,
    SetType(ModalType),
    SetOpen(bool),
}

pub fn reduce(state: &mut ClientState, action: Action) {
    match action {
        Action::SetCredentials { access_token } => state.auth.token = Some(access_token),
        Action::LogOut => state.auth.token = None,
        Action::SetType(kind) => state.modal.kind = kind,
        Action::SetOpen(open) => state.modal.open = open,
    }
}

/// Shared client state. Every change goes through [`Store::dispatch`];
/// observers get notified through [`Store::subscribe`].
#[derive(Debug)]
pub struct Store {
    tx: watch::Sender<ClientState>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(ClientState::default())
    }
}

impl Store {
    pub fn new(initial: ClientState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn dispatch(&self, action: Action) {
        tracing::trace!(?action, "dispatch");
        self.tx.send_modify(|state| reduce(state, action));
    }

    pub fn snapshot(&self) -> ClientState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ClientState> {
        self.tx.subscribe()
    }

    pub fn current_token(&self) -> Option<String> {
        self.tx.borrow().auth.token.clone()
    }

    pub fn current_type(&self) -> ModalType {
        self.tx.borrow().modal.kind
    }

    pub fn current_open(&self) -> bool {
        self.tx.borrow().modal.open
    }
}
