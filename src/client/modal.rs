use std::sync::Arc;

use super::{
    auth_api::{AuthClient, ClientError},
    store::{Action, ModalType, Store},
};

/// Page-level scroll suppression while the modal is open.
pub trait ScrollLock: Send + Sync {
    fn set_locked(&self, locked: bool);
}

/// Where a click landed relative to the modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    Inside,
    Outside,
    CloseButton,
}

/// What the modal should render. The email being confirmed is passed
/// explicitly to the sign-up views rather than kept in global state.
#[derive(Debug, PartialEq, Eq)]
pub enum ModalView<'a> {
    SignIn,
    SignUp { email: &'a mut String },
    ConfirmSignUp { email: &'a str },
}

pub struct ModalController {
    store: Arc<Store>,
    page: Arc<dyn ScrollLock>,
    email: String,
}

impl ModalController {
    pub fn new(store: Arc<Store>, page: Arc<dyn ScrollLock>) -> Self {
        let controller = Self {
            store,
            page,
            email: String::new(),
        };
        controller.sync_scroll();
        controller
    }

    pub fn is_open(&self) -> bool {
        self.store.current_open()
    }

    /// Re-applies the scroll lock from the current open flag. Call after the
    /// flag is changed by anything other than this controller.
    pub fn sync_scroll(&self) {
        self.page.set_locked(self.store.current_open());
    }

    pub fn open_with(&self, kind: ModalType) {
        self.store.dispatch(Action::SetType(kind));
        self.store.dispatch(Action::SetOpen(true));
        self.sync_scroll();
    }

    pub fn close(&self) {
        self.store.dispatch(Action::SetOpen(false));
        self.sync_scroll();
    }

    pub fn on_click(&self, target: ClickTarget) {
        match target {
            ClickTarget::Inside => {}
            ClickTarget::Outside | ClickTarget::CloseButton => self.close(),
        }
    }

    pub fn current_view(&mut self) -> ModalView<'_> {
        match self.store.current_type() {
            ModalType::SignIn => ModalView::SignIn,
            ModalType::SignUp => ModalView::SignUp {
                email: &mut self.email,
            },
            ModalType::ConfirmSignUp => ModalView::ConfirmSignUp { email: &self.email },
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Moves to the confirmation view after a successful sign-up.
    pub fn signed_up(&mut self, email: impl Into<String>) {
        self.email = email.into();
        self.store.dispatch(Action::SetType(ModalType::ConfirmSignUp));
    }

    /// "Email confirmed? Sign in" from the confirmation view.
    pub fn go_to_sign_in(&self) {
        self.store.dispatch(Action::SetType(ModalType::SignIn));
    }

    /// Back to the sign-up form, keeping the entered email.
    pub fn go_to_sign_up(&self) {
        self.store.dispatch(Action::SetType(ModalType::SignUp));
    }

    pub async fn resend_confirmation(&self, client: &AuthClient) -> Result<(), ClientError> {
        client.resend_confirmation_email(&self.email).await
    }
}

impl Drop for ModalController {
    fn drop(&mut self) {
        self.page.set_locked(false);
    }
}
