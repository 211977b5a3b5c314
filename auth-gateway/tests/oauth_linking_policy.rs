//! Table-driven coverage of the provider/role linking matrix: which providers may
//! link which discriminators, and that every disallowed pairing surfaces as
//! `PROVIDER_ROLE_MISMATCH` rather than silently writing to the wrong column.

use auth_gateway::directory::{Discriminator, Provider};
use rstest::rstest;

#[rstest]
#[case(Provider::P1, Discriminator::Teacher, true)]
#[case(Provider::P1, Discriminator::Student, true)]
#[case(Provider::P1, Discriminator::Parent, false)]
#[case(Provider::P1, Discriminator::Admin, false)]
#[case(Provider::P2, Discriminator::Teacher, true)]
#[case(Provider::P2, Discriminator::Student, true)]
#[case(Provider::P2, Discriminator::Parent, false)]
#[case(Provider::P2, Discriminator::Admin, false)]
#[case(Provider::P3, Discriminator::Student, true)]
#[case(Provider::P3, Discriminator::Parent, true)]
#[case(Provider::P3, Discriminator::Teacher, false)]
#[case(Provider::P3, Discriminator::Admin, false)]
#[case(Provider::P4, Discriminator::Student, true)]
#[case(Provider::P4, Discriminator::Parent, true)]
#[case(Provider::P4, Discriminator::Teacher, false)]
#[case(Provider::P4, Discriminator::Admin, false)]
fn column_name_reflects_the_linking_matrix(#[case] provider: Provider, #[case] discriminator: Discriminator, #[case] eligible: bool) {
    assert_eq!(provider.column_name(discriminator).is_some(), eligible);
}

#[rstest]
#[case(Provider::P1)]
#[case(Provider::P2)]
fn p1_and_p2_never_touch_the_p3_subject_column(#[case] provider: Provider) {
    for discriminator in provider.eligible_discriminators() {
        let column = provider.column_name(*discriminator).expect("listed as eligible");
        assert_ne!(column, "p3_subject");
    }
}

#[rstest]
#[case(Provider::P3)]
#[case(Provider::P4)]
fn p3_and_p4_share_the_same_column(#[case] provider: Provider) {
    for discriminator in provider.eligible_discriminators() {
        let column = provider.column_name(*discriminator).expect("listed as eligible");
        assert_eq!(column, "p3_subject");
    }
}

#[test]
fn admin_is_never_eligible_for_any_provider() {
    for provider in [Provider::P1, Provider::P2, Provider::P3, Provider::P4] {
        assert_eq!(provider.column_name(Discriminator::Admin), None);
    }
}

#[test]
fn provider_as_str_round_trips_through_from_str() {
    for provider in [Provider::P1, Provider::P2, Provider::P3, Provider::P4] {
        let parsed: Provider = provider.as_str().parse().expect("canonical provider string parses");
        assert_eq!(parsed.as_str(), provider.as_str());
    }
}
